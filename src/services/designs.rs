//! Design records.

use serde::Deserialize;
use uuid::Uuid;

use super::Shop;
use crate::auth::Identity;
use crate::domain::aggregates::{Design, DesignDraft, DesignSource};
use crate::domain::events::{DesignEvent, DomainEvent};
use crate::storage::{decode_png_data_url, design_key, DESIGN_BUCKET};
use crate::{Result, ShopError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDesignRequest {
    #[serde(default)]
    pub image_data_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub design: DesignDraft,
}

impl SaveDesignRequest {
    fn into_source(self) -> Result<DesignSource> {
        match (self.image_data_url, self.image_url) {
            (Some(data_url), _) => Ok(DesignSource::Upload { data_url, draft: self.design }),
            (None, Some(url)) => Ok(DesignSource::Hosted { url, draft: self.design }),
            (None, None) => Err(ShopError::Validation("Design image is required".into())),
        }
    }
}

impl Shop {
    /// Resolves a cart or studio design source into a stored design owned by `owner`.
    pub(crate) async fn resolve_design(&self, owner: Uuid, source: DesignSource) -> Result<Design> {
        let (image_url, draft) = match source {
            DesignSource::Existing(id) => {
                let design = self.store.get_design(id).await?.ok_or(ShopError::NotFound("Design"))?;
                if !design.is_owned_by(owner) {
                    return Err(ShopError::Forbidden("Design belongs to another user".into()));
                }
                return Ok(design);
            }
            DesignSource::Upload { data_url, draft } => {
                let bytes = decode_png_data_url(&data_url).map_err(|e| ShopError::Validation(e.to_string()))?;
                let url = self.objects.put(DESIGN_BUCKET, &design_key(owner), bytes).await?;
                (url, draft)
            }
            DesignSource::Hosted { url, draft } => {
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(ShopError::Validation("Design image URL must be http(s)".into()));
                }
                (url, draft)
            }
        };

        let mut design = Design::create(owner, image_url, draft);
        self.store.insert_design(&design).await?;
        tracing::info!(design_id = %design.id, %owner, "design saved");
        self.publish(design.take_events()).await;
        Ok(design)
    }

    pub async fn save_design(&self, identity: &Identity, request: SaveDesignRequest) -> Result<Design> {
        self.resolve_design(identity.user_id, request.into_source()?).await
    }

    pub async fn list_designs(&self, identity: &Identity) -> Result<Vec<Design>> {
        Ok(self.store.list_designs(identity.user_id).await?)
    }

    /// Orders that referenced the design keep existing with no design reference.
    pub async fn delete_design(&self, identity: &Identity, design_id: Uuid) -> Result<()> {
        let design = self.store.get_design(design_id).await?.ok_or(ShopError::NotFound("Design"))?;
        if !design.is_owned_by(identity.user_id) && !identity.is_admin() {
            return Err(ShopError::Forbidden("Design belongs to another user".into()));
        }
        if !self.store.delete_design(design_id).await? {
            return Err(ShopError::NotFound("Design"));
        }
        tracing::info!(%design_id, "design deleted");
        self.publish(vec![DomainEvent::Design(DesignEvent::Deleted { design_id, owner: design.owner })]).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Role;
    use crate::notifications::MockMailer;
    use crate::payments::MockPaymentGateway;
    use crate::services::testing::{shop, user};
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    fn png_data_url() -> String {
        format!("data:image/png;base64,{}", BASE64.encode(b"\x89PNG\r\n\x1a\nbody"))
    }

    #[tokio::test]
    async fn test_save_uploaded_design() {
        let f = shop(MockPaymentGateway::new(), MockMailer::new());
        let me = user(&f.store, "a@example.com", &[Role::User]).await;
        let request = SaveDesignRequest { image_data_url: Some(png_data_url()), image_url: None, design: DesignDraft { color: Some("#FF0000".into()), ..Default::default() } };
        let design = f.shop.save_design(&me, request).await.unwrap();
        assert!(design.image_url.starts_with(&format!("http://localhost:8083/storage/wristband-designs/{}/", me.user_id)));
        assert_eq!(design.color, "#FF0000");
        assert_eq!(f.shop.list_designs(&me).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_back_to_back_uploads_keep_both_images() {
        let f = shop(MockPaymentGateway::new(), MockMailer::new());
        let me = user(&f.store, "a@example.com", &[Role::User]).await;
        let upload = |body: &[u8]| {
            let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
            png.extend_from_slice(body);
            SaveDesignRequest { image_data_url: Some(format!("data:image/png;base64,{}", BASE64.encode(png))), image_url: None, design: DesignDraft::default() }
        };
        let first = f.shop.save_design(&me, upload(b"front")).await.unwrap();
        let second = f.shop.save_design(&me, upload(b"back")).await.unwrap();
        assert_ne!(first.image_url, second.image_url);

        let prefix = "http://localhost:8083/storage/";
        for (design, body) in [(&first, &b"front"[..]), (&second, &b"back"[..])] {
            let path = f._dir.path().join(design.image_url.strip_prefix(prefix).unwrap());
            assert!(std::fs::read(path).unwrap().ends_with(body));
        }
    }

    #[tokio::test]
    async fn test_rejects_bad_images() {
        let f = shop(MockPaymentGateway::new(), MockMailer::new());
        let me = user(&f.store, "a@example.com", &[Role::User]).await;
        let bad = SaveDesignRequest { image_data_url: Some("data:text/plain;base64,AAAA".into()), image_url: None, design: DesignDraft::default() };
        assert!(matches!(f.shop.save_design(&me, bad).await, Err(ShopError::Validation(_))));
        let none = SaveDesignRequest { image_data_url: None, image_url: None, design: DesignDraft::default() };
        assert!(matches!(f.shop.save_design(&me, none).await, Err(ShopError::Validation(_))));
        let ftp = SaveDesignRequest { image_data_url: None, image_url: Some("ftp://x/y.png".into()), design: DesignDraft::default() };
        assert!(matches!(f.shop.save_design(&me, ftp).await, Err(ShopError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_design_ownership() {
        let f = shop(MockPaymentGateway::new(), MockMailer::new());
        let me = user(&f.store, "a@example.com", &[Role::User]).await;
        let other = user(&f.store, "b@example.com", &[Role::User]).await;
        let request = SaveDesignRequest { image_data_url: None, image_url: Some("https://cdn/x.png".into()), design: DesignDraft::default() };
        let design = f.shop.save_design(&me, request).await.unwrap();

        assert!(matches!(f.shop.delete_design(&other, design.id).await, Err(ShopError::Forbidden(_))));
        f.shop.delete_design(&me, design.id).await.unwrap();
        assert!(matches!(f.shop.delete_design(&me, design.id).await, Err(ShopError::NotFound("Design"))));
    }
}
