use autotech_domain::password::{evaluate, validate_email, validate_sign_up_password, PasswordStrength};
use autotech_domain::{CostRange, Difficulty, LinkedProcedure, Procedure, Relationship, ServiceCategory, VehicleMake};
use serde_json::json;

#[test]
fn test_procedure_wire_shape_is_camel_case() {
    let p: Procedure = serde_json::from_value(json!({
        "id": "x", "category": "ecu-cloning", "title": "Clone", "description": "",
        "timeMinutes": 30, "difficulty": "expert", "cost": {"min": 10, "max": 20},
        "tools": [{"name": "KTAG", "required": true}], "steps": ["a"], "chipType": "ID46"
    })).unwrap();
    assert_eq!(p.category, ServiceCategory::EcuCloning);
    assert_eq!(p.difficulty, Difficulty::Expert);
    assert!(p.notes().is_empty());
    let back = serde_json::to_value(&p).unwrap();
    assert_eq!(back["timeMinutes"], 30);
    assert_eq!(back["chipType"], "ID46");
    // notas ausentes no se serializan
    assert!(back.get("notes").is_none());
}

#[test]
fn test_nested_catalog_validation_reaches_procedures() {
    let make: VehicleMake = serde_json::from_value(json!({
        "make": "BMW",
        "models": [{"model": "X5", "years": "2010", "procedures": [{
            "id": "p", "category": "dashboard", "title": "  ", "description": "",
            "timeMinutes": 0, "difficulty": "easy", "cost": {"min": 0, "max": 0}, "tools": [], "steps": []
        }]}]
    })).unwrap();
    assert!(make.validate().is_err());
}

#[test]
fn test_inverted_cost_range_is_rejected_on_parse() {
    assert!(CostRange::new(5, 1).is_err());
    let parsed: Result<Procedure, _> = serde_json::from_value(json!({
        "id": "x", "category": "dashboard", "title": "T", "description": "",
        "timeMinutes": 1, "difficulty": "easy", "cost": {"min": 9, "max": 1}, "tools": [], "steps": []
    }));
    assert!(parsed.is_err());
}

#[test]
fn test_links_default_and_self_check() {
    let link: LinkedProcedure =
        serde_json::from_value(json!({"id": "l", "procedure_id": "a", "linked_procedure_id": "b", "relationship": null}))
            .unwrap();
    assert_eq!(link.relationship, Relationship::Related);
    assert!(LinkedProcedure::check_endpoints("a", "a").is_err());
    assert!(LinkedProcedure::check_endpoints("a", "b").is_ok());
}

#[test]
fn test_password_strength_thresholds() {
    assert_eq!(evaluate("abc").strength, PasswordStrength::Weak);
    assert_eq!(evaluate("abcdefgh1").strength, PasswordStrength::Medium);
    assert_eq!(evaluate("Abcdefgh1").strength, PasswordStrength::Strong);
    assert!(validate_sign_up_password("Abcdefgh1").is_ok());
    assert!(validate_sign_up_password("abcdefgh1").is_err());
    assert!(validate_email("tech@shop.io").is_ok());
    assert!(validate_email("tech@shop").is_err());
}
