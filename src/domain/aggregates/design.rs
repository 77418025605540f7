//! Design Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::events::{DesignEvent, DomainEvent};
use crate::domain::value_objects::WristbandType;

pub const DEFAULT_COLOR: &str = "#FFFFFF";

/// A saved wristband artwork: the rasterized canvas plus the choices behind it.
#[derive(Clone, Debug, Serialize)]
pub struct Design {
    pub id: Uuid,
    pub owner: Uuid,
    pub image_url: String,
    pub color: String,
    pub wristband_type: WristbandType,
    pub custom_text: Option<String>,
    pub text_color: Option<String>,
    pub text_position: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

/// Fields the studio submits when saving.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignDraft {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub wristband_type: Option<WristbandType>,
    #[serde(default)]
    pub custom_text: Option<String>,
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub text_position: Option<serde_json::Value>,
}

impl Design {
    pub fn create(owner: Uuid, image_url: impl Into<String>, draft: DesignDraft) -> Self {
        let id = Uuid::now_v7();
        let custom_text = draft.custom_text.filter(|t| !t.trim().is_empty());
        Self {
            id, owner, image_url: image_url.into(),
            color: draft.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            wristband_type: draft.wristband_type.unwrap_or_default(),
            custom_text, text_color: draft.text_color, text_position: draft.text_position,
            created_at: Utc::now(),
            events: vec![DomainEvent::Design(DesignEvent::Saved { design_id: id, owner })],
        }
    }

    pub fn is_owned_by(&self, user: Uuid) -> bool { self.owner == user }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
}
