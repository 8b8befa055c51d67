//! # Master-Data Commands
//!
//! Shippers, consignees, product types and flower types. Every write is
//! persisted first, then fanned out through the broadcaster so open edit
//! sessions see it.

use tracing::debug;
use waybill_core::{ChangeAction, MasterDataChange, MasterDataKind, MasterRecord};

use crate::context::AppContext;
use crate::error::ApiResult;
use crate::state::{Subscription, SubscriptionId};

impl AppContext {
    /// Creates or updates a record (matched by id, then by name) and
    /// notifies listeners.
    pub async fn save_master_data(&self, record: MasterRecord) -> ApiResult<MasterRecord> {
        debug!(kind = %record.kind, name = %record.name, "save_master_data command");
        let (saved, action) = self.db.master_data().upsert(&record).await?;

        self.broadcaster.notify(&MasterDataChange {
            kind: saved.kind,
            action,
            record: saved.clone(),
        });
        Ok(saved)
    }

    pub async fn delete_master_data(&self, kind: MasterDataKind, name: &str) -> ApiResult<MasterRecord> {
        debug!(kind = %kind, name = %name, "delete_master_data command");
        let removed = self.db.master_data().delete(kind, name).await?;

        self.broadcaster.notify(&MasterDataChange {
            kind,
            action: ChangeAction::Deleted,
            record: removed.clone(),
        });
        Ok(removed)
    }

    /// Records of one kind, ordered by name.
    pub async fn list_master_data(&self, kind: MasterDataKind) -> ApiResult<Vec<MasterRecord>> {
        Ok(self.db.master_data().list(kind).await?)
    }

    /// Registers `callback` for every master-data change until the returned
    /// guard is dropped.
    pub fn on_master_data_changed<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&MasterDataChange) + Send + Sync + 'static,
    {
        self.broadcaster.subscribe(callback)
    }

    pub fn off_master_data_changed(&self, id: SubscriptionId) -> bool {
        self.broadcaster.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::local_context;
    use crate::error::ErrorCode;
    use std::sync::{Arc, Mutex};

    fn recorder(ctx: &AppContext) -> (Subscription, Arc<Mutex<Vec<(ChangeAction, String)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscription = ctx.on_master_data_changed(move |change| {
            sink.lock()
                .unwrap()
                .push((change.action, change.record.name.clone()));
        });
        (subscription, seen)
    }

    #[tokio::test]
    async fn test_same_name_different_case_is_an_update() {
        let ctx = local_context().await;
        let (_subscription, seen) = recorder(&ctx);

        let first = ctx
            .save_master_data(MasterRecord::new(MasterDataKind::Shipper, "andes flowers"))
            .await
            .unwrap();
        let second = ctx
            .save_master_data(MasterRecord::new(MasterDataKind::Shipper, "Andes  Flowers"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(ctx.list_master_data(MasterDataKind::Shipper).await.unwrap().len(), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (ChangeAction::Created, "andes flowers".to_string()),
                (ChangeAction::Updated, "Andes  Flowers".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_notifies_and_missing_is_not_found() {
        let ctx = local_context().await;
        ctx.save_master_data(MasterRecord::new(MasterDataKind::FlowerType, "Freedom"))
            .await
            .unwrap();
        let (_subscription, seen) = recorder(&ctx);

        ctx.delete_master_data(MasterDataKind::FlowerType, "FREEDOM")
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap()[0].0, ChangeAction::Deleted);

        let err = ctx
            .delete_master_data(MasterDataKind::FlowerType, "Freedom")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected_without_notifying() {
        let ctx = local_context().await;
        let (_subscription, seen) = recorder(&ctx);

        let err = ctx
            .save_master_data(MasterRecord::new(MasterDataKind::Consignee, "   "))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_session_observes_changes() {
        let ctx = local_context().await;
        let session = ctx.new_session();

        ctx.save_master_data(MasterRecord::new(MasterDataKind::ProductType, "Roses"))
            .await
            .unwrap();
        let changes = session.take_master_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, MasterDataKind::ProductType);

        drop(session);
        assert_eq!(ctx.broadcaster().subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_off_master_data_changed() {
        let ctx = local_context().await;
        let (subscription, seen) = recorder(&ctx);
        assert!(ctx.off_master_data_changed(subscription.id()));

        ctx.save_master_data(MasterRecord::new(MasterDataKind::Shipper, "Andes Flowers"))
            .await
            .unwrap();
        assert!(seen.lock().unwrap().is_empty());
    }
}
