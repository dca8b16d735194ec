use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ItemId);
id_newtype!(VideoId);

/// A priced inventory row as persisted by the server.
///
/// `sort_order` only establishes the initial order after a fetch. Once the
/// client has a local reorder pending, array position is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    pub date: DateTime<Utc>,
    pub sort_order: i64,
}

impl Item {
    pub fn draft(&self) -> ItemDraft {
        ItemDraft {
            name: self.name.clone(),
            quantity: self.quantity,
            price: self.price,
            date: self.date,
        }
    }
}

/// Item fields without the server-assigned `id` and `sort_order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    pub quantity: i64,
    pub price: f64,
    pub date: DateTime<Utc>,
}

impl ItemDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.quantity < 0 {
            return Err(ValidationError::NegativeQuantity);
        }
        if !self.price.is_finite() {
            return Err(ValidationError::InvalidPrice(self.price.to_string()));
        }
        if self.price < 0.0 {
            return Err(ValidationError::NegativePrice);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ItemDraft {
        ItemDraft {
            name: "bolts".into(),
            quantity: 4,
            price: 1.25,
            date: "2024-03-01T00:00:00Z".parse().expect("timestamp"),
        }
    }

    #[test]
    fn accepts_well_formed_draft() {
        draft().validate().expect("valid");
    }

    #[test]
    fn rejects_blank_name() {
        let mut draft = draft();
        draft.name = "   ".into();
        assert_eq!(draft.validate(), Err(ValidationError::EmptyName));
    }

    #[test]
    fn rejects_negative_quantity_and_price() {
        let mut negative_quantity = draft();
        negative_quantity.quantity = -1;
        assert_eq!(
            negative_quantity.validate(),
            Err(ValidationError::NegativeQuantity)
        );

        let mut negative_price = draft();
        negative_price.price = -0.5;
        assert_eq!(negative_price.validate(), Err(ValidationError::NegativePrice));

        let mut nan_price = draft();
        nan_price.price = f64::NAN;
        assert!(matches!(
            nan_price.validate(),
            Err(ValidationError::InvalidPrice(_))
        ));
    }

    #[test]
    fn item_ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&vec![ItemId(3), ItemId(1)]).expect("json");
        assert_eq!(json, "[3,1]");
    }
}
