use std::sync::Arc;

use autotech_core::auth::grant_admin;
use autotech_core::{AdminGate, AdminService, AuthProvider, CatalogRepository, CoreError, DetailLoader,
                    DetailSelection, FeedbackService, GateMode, InMemoryAuthProvider, InMemoryDataClient, ModelInfo,
                    ModerationService, ProcedureScope, Table};
use autotech_domain::{FeedbackDraft, FeedbackStatus, ProcedureDraft, Relationship};

#[test]
fn admin_flow_from_sign_up_to_published_feedback() {
    let client = Arc::new(InMemoryDataClient::new());
    let auth = InMemoryAuthProvider::new();
    let gate = AdminGate::new(GateMode::Enforced);

    let admin_user = auth.sign_up("admin@shop.io", "Adm1n!pass", "Admin").unwrap();
    // sin rol todavía
    let denied = AdminService::open(client.clone(), &gate, auth.current_user().as_ref());
    assert!(matches!(denied, Err(CoreError::Unauthorized(_))));
    grant_admin(&*client, &admin_user.id).unwrap();
    let mut admin = AdminService::open(client.clone(), &gate, auth.current_user().as_ref()).unwrap();

    let make = admin.catalog_mut().add_make("Mercedes-Benz").unwrap();
    let key = admin.catalog_mut().add_model(&make.id, &ModelInfo::new("C-Class (W204)", "2007-2014")).unwrap();
    let draft = ProcedureDraft { title: "EIS Key Programming".into(),
                                 description: "Add a key via EIS read".into(),
                                 category: "key-programming".into(),
                                 difficulty: "hard".into(),
                                 time_minutes: Some(80),
                                 cost_min: Some(200),
                                 cost_max: Some(350),
                                 chip_type: Some("NEC".into()),
                                 ..Default::default() };
    let eis = admin.catalog_mut().add_procedure(&key, draft.into_procedure().unwrap()).unwrap();
    let draft = ProcedureDraft { title: "ESL Emulator Install".into(),
                                 category: "immo-off".into(),
                                 difficulty: "expert".into(),
                                 ..Default::default() };
    let esl = admin.catalog_mut().add_procedure(&key, draft.into_procedure().unwrap()).unwrap();
    admin.add_link(&eis, &esl, Relationship::Required).unwrap();

    // un técnico cualquiera envía feedback
    auth.sign_out().unwrap();
    let tech = auth.sign_up("tech@shop.io", "Tech!pass1", "Tech").unwrap();
    let feedback = FeedbackService::new(client.clone());
    let submitted = feedback.submit(&tech,
                                    &FeedbackDraft { procedure_id: eis.clone(),
                                                     variant_id: None,
                                                     content: "EIS must be removed for AKL".into(),
                                                     feedback_type: "correction".into() })
                            .unwrap();
    assert!(ModerationService::open(client.clone(), &gate, Some(&tech)).is_err());

    let moderation = ModerationService::open(client.clone(), &gate, Some(&admin_user)).unwrap();
    assert_eq!(moderation.list(Some(FeedbackStatus::Pending)).unwrap().len(), 1);
    moderation.approve(&submitted.id, None, Some("confirmed")).unwrap();

    let detail = DetailLoader::new(client.clone()).load(&eis, &DetailSelection::default()).unwrap();
    assert_eq!(detail.procedure.make_name.as_deref(), Some("Mercedes-Benz"));
    assert_eq!(detail.linked[0].title, "ESL Emulator Install");
    assert_eq!(detail.feedback[0].content, "EIS must be removed for AKL");

    // borrar la marca arrastra todo lo que cuelga de ella
    admin.catalog_mut().delete_make(&make.id).unwrap();
    for table in [Table::Models, Table::Procedures, Table::LinkedProcedures, Table::ProcedureFeedback] {
        assert_eq!(client.count(table), 0, "{table}");
    }
    assert!(admin.catalog().procedures(&ProcedureScope::All).unwrap().is_empty());
}
