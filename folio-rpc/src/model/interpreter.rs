use anyhow::anyhow;
use folio_core::remote::{CancelOutcome, PingOutcome, PushOutcome, PushRequest, RegisterInfo};

use crate::proto::interpreter as proto;

impl From<PushRequest> for proto::PushRequest {
    fn from(value: PushRequest) -> Self {
        Self {
            payload: value.payload,
            note_context: value.note_context,
            user_context: value.user_context,
            configuration: value.configuration,
        }
    }
}

impl From<proto::PushRequest> for PushRequest {
    fn from(value: proto::PushRequest) -> Self {
        Self {
            payload: value.payload,
            note_context: value.note_context,
            user_context: value.user_context,
            configuration: value.configuration,
        }
    }
}

impl TryFrom<proto::PushResponse> for PushOutcome {
    type Error = anyhow::Error;

    fn try_from(value: proto::PushResponse) -> Result<Self, anyhow::Error> {
        match value.status() {
            proto::PushResultStatus::Accept => {
                if value.interpreter_job_uuid.is_empty() {
                    return Err(anyhow!("accepted push is missing interpreter_job_uuid"));
                }

                Ok(PushOutcome::Accept {
                    interpreter_process_uuid: value.interpreter_process_uuid,
                    interpreter_job_uuid: value.interpreter_job_uuid,
                })
            }
            proto::PushResultStatus::Decline => Ok(PushOutcome::Decline),
            proto::PushResultStatus::Error => Ok(PushOutcome::Error),
            proto::PushResultStatus::Unspecified => Err(anyhow!("unspecified push result status")),
        }
    }
}

impl From<PushOutcome> for proto::PushResponse {
    fn from(value: PushOutcome) -> Self {
        let mut response = Self::default();

        match value {
            PushOutcome::Accept {
                interpreter_process_uuid,
                interpreter_job_uuid,
            } => {
                response.set_status(proto::PushResultStatus::Accept);
                response.interpreter_process_uuid = interpreter_process_uuid;
                response.interpreter_job_uuid = interpreter_job_uuid;
            }
            PushOutcome::Decline => response.set_status(proto::PushResultStatus::Decline),
            PushOutcome::Error => response.set_status(proto::PushResultStatus::Error),
        }

        response
    }
}

impl TryFrom<proto::CancelResponse> for CancelOutcome {
    type Error = anyhow::Error;

    fn try_from(value: proto::CancelResponse) -> Result<Self, anyhow::Error> {
        match value.status() {
            proto::CancelResultStatus::Accept => Ok(CancelOutcome::Accept),
            proto::CancelResultStatus::NotFound => Ok(CancelOutcome::NotFound),
            proto::CancelResultStatus::Error => Ok(CancelOutcome::Error),
            proto::CancelResultStatus::Unspecified => {
                Err(anyhow!("unspecified cancel result status"))
            }
        }
    }
}

impl From<CancelOutcome> for proto::CancelResponse {
    fn from(value: CancelOutcome) -> Self {
        let mut response = Self::default();

        response.set_status(match value {
            CancelOutcome::Accept => proto::CancelResultStatus::Accept,
            CancelOutcome::NotFound => proto::CancelResultStatus::NotFound,
            CancelOutcome::Error => proto::CancelResultStatus::Error,
        });

        response
    }
}

impl From<proto::PingResponse> for PingOutcome {
    fn from(value: proto::PingResponse) -> Self {
        match value.status() {
            proto::PingResultStatus::Ok => PingOutcome::Ok,
            proto::PingResultStatus::KillMe => PingOutcome::KillMe,
        }
    }
}

impl From<PingOutcome> for proto::PingResponse {
    fn from(value: PingOutcome) -> Self {
        let mut response = Self::default();

        response.set_status(match value {
            PingOutcome::Ok => proto::PingResultStatus::Ok,
            PingOutcome::KillMe => proto::PingResultStatus::KillMe,
        });

        response
    }
}

impl TryFrom<proto::RegisterInterpreterProcessRequest> for RegisterInfo {
    type Error = anyhow::Error;

    fn try_from(value: proto::RegisterInterpreterProcessRequest) -> Result<Self, anyhow::Error> {
        if value.shebang.is_empty() {
            return Err(anyhow!("shebang must not be empty"));
        }

        let port = u16::try_from(value.port).map_err(|_| anyhow!("invalid port: {}", value.port))?;

        Ok(RegisterInfo {
            host: value.host,
            port,
            shebang: value.shebang,
            process_uuid: value.process_uuid,
        })
    }
}

impl From<RegisterInfo> for proto::RegisterInterpreterProcessRequest {
    fn from(value: RegisterInfo) -> Self {
        Self {
            host: value.host,
            port: value.port as u32,
            shebang: value.shebang,
            process_uuid: value.process_uuid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_without_job_uuid_is_rejected() {
        let mut response = proto::PushResponse::default();
        response.set_status(proto::PushResultStatus::Accept);

        assert!(PushOutcome::try_from(response).is_err());
    }

    #[test]
    fn decline_maps_to_outcome() {
        let response: proto::PushResponse = PushOutcome::Decline.into();

        assert_eq!(PushOutcome::try_from(response).unwrap(), PushOutcome::Decline);
    }

    #[test]
    fn register_rejects_out_of_range_port() {
        let request = proto::RegisterInterpreterProcessRequest {
            host: "127.0.0.1".to_string(),
            port: 70000,
            shebang: "%python".to_string(),
            process_uuid: "p-1".to_string(),
        };

        assert!(RegisterInfo::try_from(request).is_err());
    }

    #[test]
    fn error_status_is_an_outcome_not_a_failure() {
        let mut push = proto::PushResponse::default();
        push.set_status(proto::PushResultStatus::Error);
        assert_eq!(PushOutcome::try_from(push).unwrap(), PushOutcome::Error);

        let mut cancel = proto::CancelResponse::default();
        cancel.set_status(proto::CancelResultStatus::Error);
        assert_eq!(CancelOutcome::try_from(cancel).unwrap(), CancelOutcome::Error);
    }

    #[test]
    fn cancel_not_found_maps_to_outcome() {
        let response: proto::CancelResponse = CancelOutcome::NotFound.into();

        assert_eq!(CancelOutcome::try_from(response).unwrap(), CancelOutcome::NotFound);
    }

    #[test]
    fn unspecified_cancel_status_is_an_error() {
        assert!(CancelOutcome::try_from(proto::CancelResponse::default()).is_err());
    }
}
