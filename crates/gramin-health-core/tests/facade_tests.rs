//! End-to-end tests through the FFI facade.

use std::fs;
use std::sync::Arc;

use gramin_health_core::alert::MemoryDispatcher;
use gramin_health_core::triage::{KeywordClassifier, ModelArtifacts, TreatmentEntry, TreatmentReference};
use gramin_health_core::vitals::{INVALID_FORMAT_REPLY, NOT_REGISTERED_REPLY};
use gramin_health_core::{
    open_core_in_memory, AlertThresholds, Database, GraminError, GraminHealthCore, TriagePipeline,
};
use gramin_health_llm::ScriptedFormatter;

const CLASSIFIER_JSON: &str =
    r#"{"labels": [{"label": "Malaria", "keywords": ["fever", "chills"]}]}"#;

fn core_with(dispatcher: Arc<MemoryDispatcher>, formatter: ScriptedFormatter) -> GraminHealthCore {
    let classifier = KeywordClassifier::from_json_bytes(CLASSIFIER_JSON.as_bytes()).unwrap();
    let reference = TreatmentReference::from_entries(vec![TreatmentEntry {
        disease: "Malaria".into(),
        treatment: "Artemisinin combination therapy.".into(),
    }]);
    let artifacts = ModelArtifacts::new(Box::new(classifier), reference, "facade-test");
    let pipeline = TriagePipeline::new(Some(Arc::new(artifacts)), Arc::new(formatter));

    GraminHealthCore::from_parts(
        Database::open_in_memory().unwrap(),
        pipeline,
        dispatcher,
        AlertThresholds::default(),
    )
}

#[test]
fn test_sms_flow() {
    let dispatcher = Arc::new(MemoryDispatcher::new());
    let core = core_with(dispatcher.clone(), ScriptedFormatter::responding("{}"));

    let patient = core
        .register_patient("Ramesh".into(), "+919876543210".into(), None)
        .unwrap();

    let reply = core
        .handle_sms("+919876543210".into(), "BP 160 100".into())
        .unwrap();
    assert_eq!(reply.reply, "Hi Ramesh, your BP reading 160/100 is recorded.");
    assert!(reply.alert_raised);
    assert!(reply.alert_sent);
    assert_eq!(dispatcher.sent()[0].message, "High BP: 160/100");

    let bad = core.handle_sms("+919876543210".into(), "BP 160".into()).unwrap();
    assert_eq!(bad.reply, INVALID_FORMAT_REPLY);
    assert!(bad.reading.is_none());

    let stranger = core.handle_sms("+911111111111".into(), "SUGAR 90".into()).unwrap();
    assert_eq!(stranger.reply, NOT_REGISTERED_REPLY);

    let readings = core.list_readings(patient.local_id).unwrap();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].kind, "BP");
    assert_eq!(readings[0].value2, Some(100));
}

#[test]
fn test_recent_readings_and_patient_list() {
    let core = core_with(Arc::new(MemoryDispatcher::new()), ScriptedFormatter::responding("{}"));
    let patient = core
        .register_patient("Ramesh".into(), "+919876543210".into(), None)
        .unwrap();
    core.register_patient("Asha".into(), "+919555555555".into(), None)
        .unwrap();

    for body in ["SUGAR 90", "BP 120 80", "SUGAR 110", "SUGAR 130"] {
        core.handle_sms("+919876543210".into(), body.into()).unwrap();
    }

    let sugar = core
        .recent_readings(patient.local_id.clone(), "SUGAR".into(), 2)
        .unwrap();
    let values: Vec<i64> = sugar.iter().map(|r| r.value1).collect();
    assert_eq!(values, vec![110, 130]);

    let all_bp = core
        .recent_readings(patient.local_id.clone(), "BP".into(), u32::MAX)
        .unwrap();
    assert_eq!(all_bp.len(), 1);

    assert!(matches!(
        core.recent_readings(patient.local_id, "PULSE".into(), 5),
        Err(GraminError::InvalidInput(_))
    ));

    let names: Vec<String> = core.list_patients().unwrap().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Asha", "Ramesh"]);
}

#[test]
fn test_triage_flow() {
    let core = core_with(
        Arc::new(MemoryDispatcher::new()),
        ScriptedFormatter::responding(r#"{"intensity": "High", "recommendation": "See a doctor today"}"#),
    );
    let patient = core
        .register_patient("Lakshmi".into(), "+919000000001".into(), Some("+919000000002".into()))
        .unwrap();
    assert_eq!(patient.caregiver_phone.as_deref(), Some("+919000000002"));

    let report = core
        .submit_triage_report(patient.local_id.clone(), "fever".into(), "chills since Monday".into())
        .unwrap();
    assert_eq!(report.tier, "full");
    assert_eq!(report.predicted_label.as_deref(), Some("Malaria"));
    assert!(report.prediction_text.contains(" - See a doctor today"));
    assert_eq!(report.model_version.as_deref(), Some("facade-test"));

    let stored = core.list_triage_reports(patient.local_id).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].report_id, report.report_id);
}

#[test]
fn test_triage_for_unknown_patient() {
    let core = core_with(Arc::new(MemoryDispatcher::new()), ScriptedFormatter::responding("{}"));

    let err = core
        .submit_triage_report("missing".into(), "fever".into(), String::new())
        .unwrap_err();
    assert!(matches!(err, GraminError::NotFound(_)));
}

#[test]
fn test_registration_validation() {
    let core = core_with(Arc::new(MemoryDispatcher::new()), ScriptedFormatter::responding("{}"));

    assert!(matches!(
        core.register_patient(" ".into(), "+911".into(), None),
        Err(GraminError::InvalidInput(_))
    ));

    core.register_patient("A".into(), "+911".into(), None).unwrap();
    assert!(matches!(
        core.register_patient("B".into(), "+911".into(), None),
        Err(GraminError::InvalidInput(_))
    ));
}

#[test]
fn test_open_in_memory_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let classifier_path = dir.path().join("classifier.json");
    let treatments_path = dir.path().join("treatments.json");
    fs::write(&classifier_path, CLASSIFIER_JSON).unwrap();
    fs::write(
        &treatments_path,
        r#"[{"disease": "Malaria", "treatment": "Artemisinin combination therapy."}]"#,
    )
    .unwrap();

    let config_path = dir.path().join("gramin.json");
    let config = serde_json::json!({
        "artifacts": {
            "classifier_path": classifier_path,
            "treatments_path": treatments_path,
        },
        "formatter": {"api_key": null}
    });
    fs::write(&config_path, config.to_string()).unwrap();

    let core = open_core_in_memory(Some(config_path.display().to_string())).unwrap();
    assert!(core.model_available());

    let patient = core
        .register_patient("Asha".into(), "+919555555555".into(), None)
        .unwrap();
    let report = core
        .submit_triage_report(patient.local_id, "fever".into(), String::new())
        .unwrap();

    // Without credentials the formatter is unavailable and the raw treatment is shown
    if std::env::var("OPENROUTER_API_KEY").is_err() {
        assert_eq!(report.tier, "degraded");
        assert!(report.prediction_text.contains("Artemisinin combination therapy."));
    }
}
