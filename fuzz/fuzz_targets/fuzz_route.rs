#![no_main]
use libfuzzer_sys::fuzz_target;
use mandate_core::decision::Decision;
use mandate_core::matrix::AuthorityMatrix;
use mandate_core::traits::Assignments;
use mandate_core::types::ApproverRole;
use mandate_engine::policy::classifier::ThresholdClassifier;

fuzz_target!(|data: &[u8]| {
    let Ok(decision) = serde_json::from_slice::<Decision>(data) else {
        return;
    };
    let directory = [
        ApproverRole::Ceo,
        ApproverRole::BoardChair,
        ApproverRole::BoardMember,
        ApproverRole::CSuitePeer,
        ApproverRole::FunctionalHead,
        ApproverRole::LegalCounsel,
        ApproverRole::ComplianceOfficer,
        ApproverRole::AuditCommittee,
        ApproverRole::RegulatoryLiaison,
    ]
    .into_iter()
    .fold(Assignments::default(), |a, role| a.assign(role, role.as_str()));

    let matrix = AuthorityMatrix::default();
    let classified = ThresholdClassifier::default().explain(&decision).0;
    if let Ok(route) = mandate_engine::routing::route(
        decision,
        &ThresholdClassifier::default(),
        &matrix,
        &directory,
        chrono::Utc::now(),
    ) {
        assert!(route.authority_level >= classified);
        assert_eq!(route.requires_approval(), route.policy.approval_required);
    }
});
