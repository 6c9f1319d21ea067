//! Member definitions and the member handles enumerated from a type.
//!
//! Definitions (`ConstructorDef`, `MethodDef`, `AccessorDef`) are declared once
//! against a type definition, with parameter types that may reference the
//! definition's generic parameters. Handles (`ConstructorInfo`, `MethodInfo`,
//! `AccessorInfo`) pair a definition with the type it was enumerated from and
//! report parameter types closed over that type's generic arguments.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use super::{AnyArc, Instance, Target, Type};
use crate::error::{DiError, DiResult};

pub(crate) type ConstructorBody = Arc<dyn Fn(&Invocation<'_>) -> DiResult<Instance> + Send + Sync>;
pub(crate) type MethodBody =
    Arc<dyn Fn(&mut Target, &Invocation<'_>) -> DiResult<()> + Send + Sync>;
pub(crate) type Projection =
    Arc<dyn for<'a> Fn(&'a mut Target) -> Option<&'a mut Target> + Send + Sync>;
pub(crate) type Caster = Arc<dyn Fn(AnyArc) -> DiResult<AnyArc> + Send + Sync>;
pub(crate) type Disposer = Box<dyn FnOnce() + Send>;
pub(crate) type DisposeHook = Arc<dyn Fn(&AnyArc) -> Option<Disposer> + Send + Sync>;

pub(crate) const CONSTRUCTOR_NAME: &str = ".ctor";

/// Member accessibility.
///
/// Only `Public` and `Protected` constructors and methods take part in
/// injection; fields and properties must be `Public`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Internal,
    Private,
}

impl Visibility {
    /// Whether constructors and methods with this visibility are injectable.
    pub fn is_injectable(self) -> bool {
        matches!(self, Visibility::Public | Visibility::Protected)
    }
}

/// Field or property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    Field,
    Property,
}

#[derive(Clone)]
pub(crate) struct ParameterDef {
    pub(crate) name: Arc<str>,
    pub(crate) ty: Type,
}

pub(crate) struct ConstructorDef {
    pub(crate) parameters: Vec<ParameterDef>,
    pub(crate) visibility: Visibility,
    pub(crate) is_static: bool,
    pub(crate) body: ConstructorBody,
}

pub(crate) struct MethodDef {
    pub(crate) name: Arc<str>,
    pub(crate) parameters: Vec<ParameterDef>,
    pub(crate) visibility: Visibility,
    pub(crate) is_static: bool,
    pub(crate) body: MethodBody,
}

pub(crate) struct AccessorDef {
    pub(crate) kind: AccessorKind,
    pub(crate) name: Arc<str>,
    pub(crate) ty: Type,
    pub(crate) visibility: Visibility,
    pub(crate) is_static: bool,
    pub(crate) setter: Option<MethodBody>,
}

/// Arguments handed to a member body when it is invoked.
///
/// Values are positional; an absent value comes from an optional dependency
/// that could not be resolved.
pub struct Invocation<'a> {
    declaring: &'a Type,
    arguments: &'a [Option<AnyArc>],
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(declaring: &'a Type, arguments: &'a [Option<AnyArc>]) -> Self {
        Self { declaring, arguments }
    }

    /// The closed type whose member is being invoked.
    pub fn declaring_type(&self) -> &Type {
        self.declaring
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Untyped access to the value at `position`.
    pub fn raw(&self, position: usize) -> Option<&AnyArc> {
        self.arguments.get(position).and_then(Option::as_ref)
    }

    /// The value at `position`, which must be present and of type `T`.
    pub fn arg<T: Any + Send + Sync>(&self, position: usize) -> DiResult<Arc<T>> {
        self.optional::<T>(position)?.ok_or_else(|| {
            DiError::unresolved(
                format!("argument {} of {}", position, self.declaring),
                "no value was supplied",
            )
        })
    }

    /// The value at `position` if one was supplied.
    pub fn optional<T: Any + Send + Sync>(&self, position: usize) -> DiResult<Option<Arc<T>>> {
        match self.raw(position) {
            None => Ok(None),
            Some(value) => value
                .clone()
                .downcast::<T>()
                .map(Some)
                .map_err(|_| DiError::TypeMismatch(type_name::<T>().to_string())),
        }
    }

    /// A trait object produced by an interface caster.
    pub fn arg_trait<T: ?Sized + Send + Sync + 'static>(&self, position: usize) -> DiResult<Arc<T>> {
        let value = self.raw(position).ok_or_else(|| {
            DiError::unresolved(
                format!("argument {} of {}", position, self.declaring),
                "no value was supplied",
            )
        })?;
        value
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or_else(|| DiError::TypeMismatch(type_name::<T>().to_string()))
    }

    /// Clones the value at `position` out of its `Arc`.
    pub fn value<T: Any + Send + Sync + Clone>(&self, position: usize) -> DiResult<T> {
        Ok((*self.arg::<T>(position)?).clone())
    }
}

/// Name and ordered parameter signature of a constructor or method.
///
/// Used as the portable structural identity of a member: a signature taken
/// from an open definition is closed over a type's generic arguments and then
/// compared against the members of that closed type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberSignature {
    name: Arc<str>,
    parameter_names: SmallVec<[Arc<str>; 4]>,
    parameter_types: SmallVec<[Type; 4]>,
}

impl MemberSignature {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameter_names.iter().map(|n| &**n)
    }

    pub fn parameter_types(&self) -> &[Type] {
        &self.parameter_types
    }

    /// Substitutes `arguments` for the generic parameters in the signature.
    pub fn close_over(&self, arguments: &[Type]) -> Self {
        Self {
            name: self.name.clone(),
            parameter_names: self.parameter_names.clone(),
            parameter_types: self
                .parameter_types
                .iter()
                .map(|t| t.substitute(arguments))
                .collect(),
        }
    }
}

impl fmt::Display for MemberSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (name, ty)) in self
            .parameter_names
            .iter()
            .zip(self.parameter_types.iter())
            .enumerate()
        {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", ty, name)?;
        }
        f.write_str(")")
    }
}

fn signature_of(name: &Arc<str>, parameters: &[ParameterDef], types: &[Type]) -> MemberSignature {
    MemberSignature {
        name: name.clone(),
        parameter_names: parameters.iter().map(|p| p.name.clone()).collect(),
        parameter_types: types.iter().cloned().collect(),
    }
}

fn open_signature_of(name: &Arc<str>, parameters: &[ParameterDef]) -> MemberSignature {
    MemberSignature {
        name: name.clone(),
        parameter_names: parameters.iter().map(|p| p.name.clone()).collect(),
        parameter_types: parameters.iter().map(|p| p.ty.clone()).collect(),
    }
}

/// A constructor enumerated from a type.
#[derive(Clone)]
pub struct ConstructorInfo {
    declaring: Type,
    def: Arc<ConstructorDef>,
    parameter_types: SmallVec<[Type; 4]>,
}

impl ConstructorInfo {
    pub(crate) fn new(declaring: Type, def: Arc<ConstructorDef>) -> Self {
        let parameter_types = def
            .parameters
            .iter()
            .map(|p| p.ty.substitute(declaring.generic_arguments()))
            .collect();
        Self {
            declaring,
            def,
            parameter_types,
        }
    }

    pub fn declaring_type(&self) -> &Type {
        &self.declaring
    }

    pub fn visibility(&self) -> Visibility {
        self.def.visibility
    }

    pub fn is_static(&self) -> bool {
        self.def.is_static
    }

    pub fn parameter_types(&self) -> &[Type] {
        &self.parameter_types
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_types.len()
    }

    pub fn parameters(&self) -> Vec<ParameterInfo> {
        MethodBase::Constructor(self.clone()).parameters()
    }

    /// Signature with parameter types closed over the declaring type.
    pub fn signature(&self) -> MemberSignature {
        signature_of(&Arc::from(CONSTRUCTOR_NAME), &self.def.parameters, &self.parameter_types)
    }

    /// Signature as written on the type definition.
    pub fn open_signature(&self) -> MemberSignature {
        open_signature_of(&Arc::from(CONSTRUCTOR_NAME), &self.def.parameters)
    }

    pub(crate) fn is_injectable(&self) -> bool {
        self.def.visibility.is_injectable() && !self.def.is_static
    }

    pub(crate) fn invoke(&self, arguments: &[Option<AnyArc>]) -> DiResult<Instance> {
        (self.def.body)(&Invocation::new(&self.declaring, arguments))
    }
}

impl PartialEq for ConstructorInfo {
    fn eq(&self, other: &Self) -> bool {
        self.declaring == other.declaring && self.signature() == other.signature()
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring, self.signature())
    }
}

/// A method enumerated from a type.
#[derive(Clone)]
pub struct MethodInfo {
    declaring: Type,
    def: Arc<MethodDef>,
    parameter_types: SmallVec<[Type; 4]>,
}

impl MethodInfo {
    pub(crate) fn new(declaring: Type, def: Arc<MethodDef>) -> Self {
        let parameter_types = def
            .parameters
            .iter()
            .map(|p| p.ty.substitute(declaring.generic_arguments()))
            .collect();
        Self {
            declaring,
            def,
            parameter_types,
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn declaring_type(&self) -> &Type {
        &self.declaring
    }

    pub fn visibility(&self) -> Visibility {
        self.def.visibility
    }

    pub fn is_static(&self) -> bool {
        self.def.is_static
    }

    pub fn parameter_types(&self) -> &[Type] {
        &self.parameter_types
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_types.len()
    }

    pub fn parameters(&self) -> Vec<ParameterInfo> {
        MethodBase::Method(self.clone()).parameters()
    }

    pub fn signature(&self) -> MemberSignature {
        signature_of(&self.def.name, &self.def.parameters, &self.parameter_types)
    }

    pub fn open_signature(&self) -> MemberSignature {
        open_signature_of(&self.def.name, &self.def.parameters)
    }

    pub(crate) fn is_injectable(&self) -> bool {
        self.def.visibility.is_injectable() && !self.def.is_static
    }

    pub(crate) fn invoke(&self, target: &mut Target, arguments: &[Option<AnyArc>]) -> DiResult<()> {
        (self.def.body)(target, &Invocation::new(&self.declaring, arguments))
    }
}

impl PartialEq for MethodInfo {
    fn eq(&self, other: &Self) -> bool {
        self.declaring == other.declaring && self.signature() == other.signature()
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring, self.signature())
    }
}

/// Either kind of member that takes parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum MethodBase {
    Constructor(ConstructorInfo),
    Method(MethodInfo),
}

impl MethodBase {
    pub fn declaring_type(&self) -> &Type {
        match self {
            MethodBase::Constructor(c) => c.declaring_type(),
            MethodBase::Method(m) => m.declaring_type(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MethodBase::Constructor(_) => CONSTRUCTOR_NAME,
            MethodBase::Method(m) => m.name(),
        }
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self, MethodBase::Constructor(_))
    }

    pub fn parameter_types(&self) -> &[Type] {
        match self {
            MethodBase::Constructor(c) => c.parameter_types(),
            MethodBase::Method(m) => m.parameter_types(),
        }
    }

    fn parameter_defs(&self) -> &[ParameterDef] {
        match self {
            MethodBase::Constructor(c) => &c.def.parameters,
            MethodBase::Method(m) => &m.def.parameters,
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_defs().len()
    }

    /// Parameter names in declaration order.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameter_defs().iter().map(|p| &*p.name)
    }

    pub fn parameters(&self) -> Vec<ParameterInfo> {
        (0..self.parameter_count())
            .map(|position| ParameterInfo {
                member: self.clone(),
                position,
            })
            .collect()
    }

    pub fn signature(&self) -> MemberSignature {
        match self {
            MethodBase::Constructor(c) => c.signature(),
            MethodBase::Method(m) => m.signature(),
        }
    }
}

/// A formal parameter of a constructor or method.
#[derive(Clone, Debug)]
pub struct ParameterInfo {
    member: MethodBase,
    position: usize,
}

impl ParameterInfo {
    pub fn member(&self) -> &MethodBase {
        &self.member
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn name(&self) -> &str {
        &self.member.parameter_defs()[self.position].name
    }

    /// Parameter type closed over the member's declaring type.
    pub fn parameter_type(&self) -> &Type {
        &self.member.parameter_types()[self.position]
    }
}

/// A field or property enumerated from a type, possibly inherited.
#[derive(Clone)]
pub struct AccessorInfo {
    declaring: Type,
    def: Arc<AccessorDef>,
    member_type: Type,
    path: SmallVec<[Projection; 2]>,
}

impl AccessorInfo {
    pub(crate) fn new(declaring: Type, def: Arc<AccessorDef>) -> Self {
        let member_type = def.ty.substitute(declaring.generic_arguments());
        Self {
            declaring,
            def,
            member_type,
            path: SmallVec::new(),
        }
    }

    /// Marks this member as reached through a base-type projection.
    pub(crate) fn inherited_through(mut self, projection: Projection) -> Self {
        self.path.insert(0, projection);
        self
    }

    pub fn kind(&self) -> AccessorKind {
        self.def.kind
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// The type that declares the member (a base type for inherited members).
    pub fn declaring_type(&self) -> &Type {
        &self.declaring
    }

    /// Field or property type closed over the declaring type.
    pub fn member_type(&self) -> &Type {
        &self.member_type
    }

    pub fn visibility(&self) -> Visibility {
        self.def.visibility
    }

    pub fn is_static(&self) -> bool {
        self.def.is_static
    }

    pub fn is_writable(&self) -> bool {
        self.def.setter.is_some()
    }

    pub fn is_inherited(&self) -> bool {
        !self.path.is_empty()
    }

    pub(crate) fn assign(&self, target: &mut Target, value: Option<AnyArc>) -> DiResult<()> {
        let setter = self.def.setter.as_ref().ok_or_else(|| {
            DiError::selection(self.declaring.to_string(), self.name(), "member is read-only")
        })?;
        let target = project(&self.path, target).ok_or_else(|| {
            DiError::TypeMismatch(format!(
                "target does not contain an instance of {}",
                self.declaring
            ))
        })?;
        let arguments = [value];
        setter(target, &Invocation::new(&self.declaring, &arguments))
    }
}

impl PartialEq for AccessorInfo {
    fn eq(&self, other: &Self) -> bool {
        self.def.kind == other.def.kind
            && self.declaring == other.declaring
            && self.def.name == other.def.name
            && self.member_type == other.member_type
    }
}

impl fmt::Debug for AccessorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {} {}::{}",
            self.def.kind, self.member_type, self.declaring, self.def.name
        )
    }
}

fn project<'t>(path: &[Projection], target: &'t mut Target) -> Option<&'t mut Target> {
    path.iter().try_fold(target, |current, step| step(current))
}
