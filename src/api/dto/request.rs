//! Request DTOs

use serde::Deserialize;

use crate::error::{ServerError, ServerResult};

/// Query of `POST /pools/:pool_id/new-references`
#[derive(Debug, Default, Deserialize)]
pub struct NewReferencesQuery {
    /// Kept as text so a malformed value maps to a typed error
    pub amount: Option<String>,
}

impl NewReferencesQuery {
    /// Requested amount; defaults to 1, must be at least 1
    pub fn amount(&self) -> ServerResult<i64> {
        let amount = match self.amount.as_deref() {
            None => 1,
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                ServerError::InvalidArgument(format!("amount must be an integer, got {raw:?}"))
            })?,
        };
        if amount < 1 {
            return Err(ServerError::InvalidAmount(amount));
        }
        Ok(amount)
    }
}

/// Body of `PATCH /status-lists/update`
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub uri: String,
    pub index: i64,
    pub value: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(amount: Option<&str>) -> NewReferencesQuery {
        NewReferencesQuery {
            amount: amount.map(String::from),
        }
    }

    #[test]
    fn test_amount_defaults_to_one() {
        assert_eq!(query(None).amount().unwrap(), 1);
        assert_eq!(query(Some("7")).amount().unwrap(), 7);
    }

    #[test]
    fn test_amount_below_one_rejected() {
        assert!(matches!(
            query(Some("0")).amount(),
            Err(ServerError::InvalidAmount(0))
        ));
        assert!(matches!(
            query(Some("-3")).amount(),
            Err(ServerError::InvalidAmount(-3))
        ));
        assert!(matches!(
            query(Some("many")).amount(),
            Err(ServerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_update_request_parses() {
        let req: UpdateStatusRequest =
            serde_json::from_str(r#"{"uri":"https://x/1","index":3,"value":1}"#).unwrap();
        assert_eq!(req.index, 3);
        assert_eq!(req.value, 1);
    }
}
