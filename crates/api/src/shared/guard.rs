use crate::error::FollowupError;
use followup_scheduler_domain::ReminderKind;

pub struct Guard {}

impl Guard {
    pub fn against_unknown_kind(val: &str) -> Result<ReminderKind, FollowupError> {
        val.parse()
            .map_err(|e| FollowupError::BadClientData(format!("{}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_rejects_unknown_kinds() {
        assert_eq!(
            Guard::against_unknown_kind("processing_step").unwrap(),
            ReminderKind::ProcessingStep
        );
        assert!(matches!(
            Guard::against_unknown_kind("callback"),
            Err(FollowupError::BadClientData(_))
        ));
    }
}
