use chrono::{DateTime, Utc};
use shared::{
    domain::{Item, ItemDraft},
    error::ValidationError,
};

/// Raw item fields as typed by the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemForm {
    pub name: String,
    pub quantity: String,
    pub price: String,
    pub date: Option<DateTime<Utc>>,
}

impl ItemForm {
    /// Prefills the form for editing an existing item.
    pub fn from_item(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            quantity: item.quantity.to_string(),
            price: item.price.to_string(),
            date: Some(item.date),
        }
    }

    pub fn parse(&self) -> Result<ItemDraft, ValidationError> {
        let name = required(&self.name, "name")?;
        let quantity = required(&self.quantity, "quantity")?;
        let price = required(&self.price, "price")?;
        let date = self.date.ok_or(ValidationError::MissingField("date"))?;

        let quantity = quantity
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidQuantity(quantity.to_string()))?;
        let price = price
            .parse::<f64>()
            .map_err(|_| ValidationError::InvalidPrice(price.to_string()))?;

        let draft = ItemDraft {
            name: name.to_string(),
            quantity,
            price,
            date,
        };
        draft.validate()?;
        Ok(draft)
    }
}

fn required<'a>(raw: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed)
}
