//! Fluent construction of described types.

use std::any::{type_name, Any};
use std::collections::HashSet;
use std::sync::Arc;

use super::members::{
    AccessorDef, ConstructorBody, ConstructorDef, MethodBody, MethodDef, ParameterDef,
};
use super::{
    AccessorKind, AnyArc, BaseDef, Caster, DisposeHook, Instance, InterfaceDef, Invocation,
    Projection, Target, Type, TypeCategory, TypeDef, TypeKind, Visibility,
};
use crate::error::{DiError, DiResult};
use crate::traits::Dispose;

/// Builder for a described type.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Type, TypeBuilder};
///
/// struct Repository<T> { default_value: Option<T> }
///
/// let builder = TypeBuilder::class("Repository").generic_parameters(&["T"]);
/// let t = builder.param("T");
/// let repository = builder
///     .constructor(|c| c.body(|_| Ok(Repository::<u32> { default_value: None })))
///     .constructor(|c| {
///         c.param("default_value", t.clone())
///             .body(|call| Ok(Repository { default_value: Some(call.value::<u32>(0)?) }))
///     })
///     .build()
///     .unwrap();
///
/// assert!(repository.is_generic_type_definition());
/// assert_eq!(repository.supported_constructors().len(), 2);
/// ```
pub struct TypeBuilder {
    name: Arc<str>,
    category: TypeCategory,
    generic_parameters: Vec<Arc<str>>,
    base: Option<BaseDef>,
    interfaces: Vec<InterfaceDef>,
    constructors: Vec<ConstructorBuilder>,
    methods: Vec<(Arc<str>, MethodBuilder)>,
    accessors: Vec<(AccessorKind, Arc<str>, Type, AccessorBuilder)>,
    dispose: Option<DisposeHook>,
}

impl TypeBuilder {
    fn new(name: &str, category: TypeCategory) -> Self {
        Self {
            name: Arc::from(name),
            category,
            generic_parameters: Vec::new(),
            base: None,
            interfaces: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            accessors: Vec::new(),
            dispose: None,
        }
    }

    pub fn class(name: &str) -> Self {
        Self::new(name, TypeCategory::Class)
    }

    pub fn abstract_class(name: &str) -> Self {
        Self::new(name, TypeCategory::Abstract)
    }

    pub fn interface(name: &str) -> Self {
        Self::new(name, TypeCategory::Interface)
    }

    /// Declares the generic parameters, in order.
    pub fn generic_parameters(mut self, names: &[&str]) -> Self {
        self.generic_parameters = names.iter().map(|n| Arc::from(*n)).collect();
        self
    }

    /// Reference to one of the declared generic parameters.
    ///
    /// An undeclared name yields a placeholder that [`build`](Self::build) rejects.
    pub fn param(&self, name: &str) -> Type {
        let position = self
            .generic_parameters
            .iter()
            .position(|p| &**p == name)
            .unwrap_or(usize::MAX);
        Type::generic_parameter(name, position)
    }

    /// Derives from `base`, whose instance lives inside `D` at `select`.
    ///
    /// Inherited fields and properties are assigned through `select`.
    pub fn extends<D, B>(mut self, base: Type, select: fn(&mut D) -> &mut B) -> Self
    where
        D: Any + Send + Sync,
        B: Any + Send + Sync,
    {
        let project = projection(move |target| {
            target
                .downcast_mut::<D>()
                .map(|derived| select(derived) as &mut Target)
        });
        self.base = Some(BaseDef { ty: base, project });
        self
    }

    /// Derives from `base` without exposing its instance.
    ///
    /// Assignability follows the base, but inherited fields and properties
    /// cannot be injected.
    pub fn extends_type(mut self, base: Type) -> Self {
        self.base = Some(BaseDef {
            ty: base,
            project: projection(|_| None),
        });
        self
    }

    pub fn implements(mut self, interface: Type) -> Self {
        self.interfaces.push(InterfaceDef {
            ty: interface,
            cast: None,
        });
        self
    }

    /// Implements `interface`, exposing instances to it as `Arc<T>`.
    ///
    /// A contract resolved through this interface yields the cast value, so it
    /// can be read back with `resolve_trait::<T>`.
    pub fn implements_as<I, T>(mut self, interface: Type, cast: fn(Arc<I>) -> Arc<T>) -> Self
    where
        I: Any + Send + Sync,
        T: ?Sized + Send + Sync + 'static,
    {
        let caster: Caster = Arc::new(move |value: AnyArc| {
            let concrete = value
                .downcast::<I>()
                .map_err(|_| DiError::TypeMismatch(type_name::<I>().to_string()))?;
            let shared: Arc<T> = cast(concrete);
            Ok(Arc::new(shared) as AnyArc)
        });
        self.interfaces.push(InterfaceDef {
            ty: interface,
            cast: Some(caster),
        });
        self
    }

    pub fn constructor(mut self, f: impl FnOnce(ConstructorBuilder) -> ConstructorBuilder) -> Self {
        self.constructors.push(f(ConstructorBuilder::default()));
        self
    }

    pub fn method(
        mut self,
        name: &str,
        f: impl FnOnce(MethodBuilder) -> MethodBuilder,
    ) -> Self {
        self.methods.push((Arc::from(name), f(MethodBuilder::default())));
        self
    }

    pub fn field(
        mut self,
        name: &str,
        ty: Type,
        f: impl FnOnce(AccessorBuilder) -> AccessorBuilder,
    ) -> Self {
        self.accessors.push((
            AccessorKind::Field,
            Arc::from(name),
            ty,
            f(AccessorBuilder::default()),
        ));
        self
    }

    pub fn property(
        mut self,
        name: &str,
        ty: Type,
        f: impl FnOnce(AccessorBuilder) -> AccessorBuilder,
    ) -> Self {
        self.accessors.push((
            AccessorKind::Property,
            Arc::from(name),
            ty,
            f(AccessorBuilder::default()),
        ));
        self
    }

    /// Instances built as `T` are disposed with the container that owns them.
    pub fn disposable<T: Dispose>(mut self) -> Self {
        let hook: DisposeHook = Arc::new(|value: &AnyArc| {
            let instance = value.clone().downcast::<T>().ok()?;
            Some(Box::new(move || instance.dispose()) as Box<dyn FnOnce() + Send>)
        });
        self.dispose = Some(hook);
        self
    }

    /// Validates the description and produces the type definition.
    pub fn build(self) -> DiResult<Type> {
        let owner = self.name.clone();
        let invalid = |detail: String| DiError::InvalidSpecification(format!("{}: {}", owner, detail));

        if self.name.trim().is_empty() {
            return Err(DiError::InvalidSpecification("type name is empty".into()));
        }
        let mut seen = HashSet::new();
        for parameter in &self.generic_parameters {
            if parameter.trim().is_empty() {
                return Err(invalid("generic parameter name is empty".into()));
            }
            if !seen.insert(parameter.clone()) {
                return Err(invalid(format!("generic parameter {} declared twice", parameter)));
            }
        }

        let params = &self.generic_parameters;
        if let Some(base) = &self.base {
            check_reference(&base.ty, params).map_err(&invalid)?;
            if !matches!(
                base.ty.category(),
                Some(TypeCategory::Class | TypeCategory::Abstract)
            ) {
                return Err(invalid(format!("base type {} is not a class", base.ty)));
            }
        }
        for interface in &self.interfaces {
            check_reference(&interface.ty, params).map_err(&invalid)?;
            if !interface.ty.is_interface() {
                return Err(invalid(format!("{} is not an interface", interface.ty)));
            }
        }
        if self.category == TypeCategory::Interface && !self.constructors.is_empty() {
            return Err(invalid("interfaces cannot declare constructors".into()));
        }

        let mut constructors = Vec::with_capacity(self.constructors.len());
        for ctor in self.constructors {
            check_parameters(&ctor.parameters, params).map_err(&invalid)?;
            let body = ctor
                .body
                .ok_or_else(|| invalid("constructor has no body".into()))?;
            constructors.push(Arc::new(ConstructorDef {
                parameters: ctor.parameters,
                visibility: ctor.visibility,
                is_static: ctor.is_static,
                body,
            }));
        }

        let mut methods = Vec::with_capacity(self.methods.len());
        for (name, method) in self.methods {
            check_parameters(&method.parameters, params)
                .map_err(|e| invalid(format!("method {}: {}", name, e)))?;
            let body = method
                .body
                .ok_or_else(|| invalid(format!("method {} has no body", name)))?;
            methods.push(Arc::new(MethodDef {
                name,
                parameters: method.parameters,
                visibility: method.visibility,
                is_static: method.is_static,
                body,
            }));
        }

        let mut accessors: Vec<Arc<AccessorDef>> = Vec::with_capacity(self.accessors.len());
        for (kind, name, ty, accessor) in self.accessors {
            check_reference(&ty, params).map_err(|e| invalid(format!("{}: {}", name, e)))?;
            if accessors.iter().any(|a| a.kind == kind && a.name == name) {
                return Err(invalid(format!("{:?} {} declared twice", kind, name)));
            }
            accessors.push(Arc::new(AccessorDef {
                kind,
                name,
                ty,
                visibility: accessor.visibility,
                is_static: accessor.is_static,
                setter: accessor.setter,
            }));
        }

        Ok(Type::from_definition(TypeDef {
            id: TypeDef::next_id(),
            name: self.name,
            category: self.category,
            generic_parameters: self.generic_parameters,
            base: self.base,
            interfaces: self.interfaces,
            constructors,
            methods,
            accessors,
            dispose: self.dispose,
        }))
    }
}

fn projection<F>(f: F) -> Projection
where
    F: for<'a> Fn(&'a mut Target) -> Option<&'a mut Target> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn typed_method_body<T, F>(body: F) -> MethodBody
where
    T: Any + Send + Sync,
    F: Fn(&mut T, &Invocation<'_>) -> DiResult<()> + Send + Sync + 'static,
{
    Arc::new(move |target: &mut Target, call: &Invocation<'_>| {
        let target = target
            .downcast_mut::<T>()
            .ok_or_else(|| DiError::TypeMismatch(type_name::<T>().to_string()))?;
        body(target, call)
    })
}

fn check_parameters(parameters: &[ParameterDef], generic: &[Arc<str>]) -> Result<(), String> {
    let mut names = HashSet::new();
    for parameter in parameters {
        if parameter.name.is_empty() {
            return Err("parameter name is empty".into());
        }
        if !names.insert(parameter.name.clone()) {
            return Err(format!("parameter {} declared twice", parameter.name));
        }
        check_reference(&parameter.ty, generic)?;
    }
    Ok(())
}

/// Generic parameters must be declared by the type being built, and open
/// definitions cannot appear as member types.
fn check_reference(ty: &Type, generic: &[Arc<str>]) -> Result<(), String> {
    match ty.kind() {
        TypeKind::GenericParameter { name, position } => {
            if generic.get(*position) == Some(name) {
                Ok(())
            } else {
                Err(format!("generic parameter {} is not declared", name))
            }
        }
        TypeKind::Array(element) => check_reference(element, generic),
        TypeKind::Constructed { arguments, .. } => arguments
            .iter()
            .try_for_each(|argument| check_reference(argument, generic)),
        TypeKind::Definition(def) if !def.generic_parameters.is_empty() => Err(format!(
            "open generic definition {} cannot be referenced directly",
            ty
        )),
        _ => Ok(()),
    }
}

/// Describes one constructor.
pub struct ConstructorBuilder {
    parameters: Vec<ParameterDef>,
    visibility: Visibility,
    is_static: bool,
    body: Option<ConstructorBody>,
}

impl Default for ConstructorBuilder {
    fn default() -> Self {
        Self {
            parameters: Vec::new(),
            visibility: Visibility::Public,
            is_static: false,
            body: None,
        }
    }
}

impl ConstructorBuilder {
    pub fn param(mut self, name: &str, ty: Type) -> Self {
        self.parameters.push(ParameterDef {
            name: Arc::from(name),
            ty,
        });
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Creates the instance from the resolved arguments.
    pub fn body<T, F>(mut self, body: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Invocation<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        let body: ConstructorBody = Arc::new(move |call: &Invocation<'_>| {
            body(call).map(|value| Box::new(value) as Instance)
        });
        self.body = Some(body);
        self
    }
}

/// Describes one method.
pub struct MethodBuilder {
    parameters: Vec<ParameterDef>,
    visibility: Visibility,
    is_static: bool,
    body: Option<MethodBody>,
}

impl Default for MethodBuilder {
    fn default() -> Self {
        Self {
            parameters: Vec::new(),
            visibility: Visibility::Public,
            is_static: false,
            body: None,
        }
    }
}

impl MethodBuilder {
    pub fn param(mut self, name: &str, ty: Type) -> Self {
        self.parameters.push(ParameterDef {
            name: Arc::from(name),
            ty,
        });
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Runs against the instance being built up, which must be a `T`.
    pub fn body<T, F>(mut self, body: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&mut T, &Invocation<'_>) -> DiResult<()> + Send + Sync + 'static,
    {
        self.body = Some(typed_method_body(body));
        self
    }
}

/// Describes a field or property.
///
/// Without a setter the member is read-only and cannot be injected.
pub struct AccessorBuilder {
    visibility: Visibility,
    is_static: bool,
    setter: Option<MethodBody>,
}

impl Default for AccessorBuilder {
    fn default() -> Self {
        Self {
            visibility: Visibility::Public,
            is_static: false,
            setter: None,
        }
    }
}

impl AccessorBuilder {
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Stores the value at position 0 of the invocation into the instance.
    pub fn setter<T, F>(mut self, setter: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&mut T, &Invocation<'_>) -> DiResult<()> + Send + Sync + 'static,
    {
        self.setter = Some(typed_method_body(setter));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget {
        size: u32,
    }

    #[test]
    fn undeclared_generic_parameter_is_rejected() {
        let stray = Type::generic_parameter("U", 0);
        let err = TypeBuilder::class("Holder")
            .generic_parameters(&["T"])
            .constructor(|c| c.param("value", stray).body(|_| Ok(())))
            .build()
            .unwrap_err();
        assert!(matches!(err, DiError::InvalidSpecification(_)));
    }

    #[test]
    fn param_outside_declared_list_is_rejected() {
        let builder = TypeBuilder::class("Holder").generic_parameters(&["T"]);
        let u = builder.param("U");
        let err = builder
            .field("value", u, |f| f)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("U"));
    }

    #[test]
    fn constructor_without_body_is_rejected() {
        let err = TypeBuilder::class("Widget")
            .constructor(|c| c.param("size", Type::of::<u32>()))
            .build()
            .unwrap_err();
        assert!(matches!(err, DiError::InvalidSpecification(_)));
    }

    #[test]
    fn duplicate_parameter_names_are_rejected() {
        let err = TypeBuilder::class("Widget")
            .constructor(|c| {
                c.param("size", Type::of::<u32>())
                    .param("size", Type::of::<u32>())
                    .body(|_| Ok(()))
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn interfaces_cannot_have_constructors() {
        let err = TypeBuilder::interface("IWidget")
            .constructor(|c| c.body(|_| Ok(())))
            .build()
            .unwrap_err();
        assert!(matches!(err, DiError::InvalidSpecification(_)));
    }

    #[test]
    fn supported_members_exclude_private_and_static() {
        let widget = TypeBuilder::class("Widget")
            .constructor(|c| c.body(|_| Ok(Widget { size: 0 })))
            .constructor(|c| {
                c.param("size", Type::of::<u32>())
                    .visibility(Visibility::Private)
                    .body(|call| Ok(Widget { size: call.value(0)? }))
            })
            .constructor(|c| {
                c.param("seed", Type::of::<u64>())
                    .static_member()
                    .body(|_| Ok(Widget { size: 1 }))
            })
            .method("Resize", |m| {
                m.param("size", Type::of::<u32>())
                    .visibility(Visibility::Protected)
                    .body(|w: &mut Widget, call| {
                        w.size = call.value(0)?;
                        Ok(())
                    })
            })
            .method("Reset", |m| {
                m.visibility(Visibility::Internal)
                    .body(|w: &mut Widget, _| {
                        w.size = 0;
                        Ok(())
                    })
            })
            .build()
            .unwrap();

        assert_eq!(widget.constructors().len(), 3);
        assert_eq!(widget.supported_constructors().len(), 1);
        let methods = widget.supported_methods();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name(), "Resize");
    }
}
