#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_inject::{GenericParameter, MatchRank, Type};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Parsing never panics; accepted names carry no shape markers
    if let Ok(reference) = GenericParameter::new(text) {
        let name = reference.parameter_type_name();
        assert!(!name.is_empty());
        assert!(!name.contains("[]"));
        assert!(!name.contains("()"));

        let parameter = Type::generic_parameter(name, 0);
        let declared = if reference.is_array() {
            parameter.make_array()
        } else {
            parameter
        };
        assert_eq!(reference.match_to(&declared), MatchRank::ExactMatch);
    }
});
