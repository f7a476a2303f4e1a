//! Write path for bootcamps, courses and reviews.
//!
//! Every write runs the same explicit steps: authorize, sanitize the body,
//! apply defaults, validate against the collection schema, persist, then
//! recompute any aggregate the write affects.

use std::sync::Arc;

use chrono::Utc;
use devcamper_core::models::{bootcamp, course, review};
use devcamper_core::sanitize::{escape_markup, strip_operator_keys};
use devcamper_core::types::{document_id, USER_FIELD};
use devcamper_core::{
    AggregateRule, CollectionSchema, Document, FilterNode, FilterTerm, Principal, RequestContext,
    Role, AVERAGE_COST, AVERAGE_RATING,
};
use serde_json::Value;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::service::aggregate::AggregateRecalculator;
use crate::storage::{DocumentStore, StoreResult};

/// The resources the API manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Bootcamp,
    Course,
    Review,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] =
        [ResourceKind::Bootcamp, ResourceKind::Course, ResourceKind::Review];

    #[must_use]
    pub fn collection(self) -> &'static str {
        match self {
            ResourceKind::Bootcamp => bootcamp::COLLECTION,
            ResourceKind::Course => course::COLLECTION,
            ResourceKind::Review => review::COLLECTION,
        }
    }

    /// Singular name used in client-facing messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Bootcamp => "bootcamp",
            ResourceKind::Course => "course",
            ResourceKind::Review => "review",
        }
    }

    /// Roles allowed to create, update or delete this resource.
    #[must_use]
    pub fn writer_roles(self) -> &'static [Role] {
        match self {
            ResourceKind::Bootcamp | ResourceKind::Course => &[Role::Publisher, Role::Admin],
            ResourceKind::Review => &[Role::User, Role::Admin],
        }
    }

    /// Field referencing the owning bootcamp, for dependent resources.
    #[must_use]
    pub fn parent_ref(self) -> Option<&'static str> {
        match self {
            ResourceKind::Bootcamp => None,
            ResourceKind::Course => Some(course::BOOTCAMP),
            ResourceKind::Review => Some(review::BOOTCAMP),
        }
    }

    /// Aggregate on the parent fed by this resource.
    #[must_use]
    pub fn aggregate(self) -> Option<&'static AggregateRule> {
        match self {
            ResourceKind::Bootcamp => None,
            ResourceKind::Course => Some(&AVERAGE_COST),
            ResourceKind::Review => Some(&AVERAGE_RATING),
        }
    }

    fn schema(self) -> CollectionSchema {
        match self {
            ResourceKind::Bootcamp => bootcamp::schema(),
            ResourceKind::Course => course::schema(),
            ResourceKind::Review => review::schema(),
        }
    }
}

/// Create, read, update and delete for every [`ResourceKind`].
pub struct ResourceService {
    store: Arc<dyn DocumentStore>,
    recalculator: AggregateRecalculator,
    bootcamps: CollectionSchema,
    courses: CollectionSchema,
    reviews: CollectionSchema,
}

impl ResourceService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, recalculator: AggregateRecalculator) -> Self {
        Self {
            store,
            recalculator,
            bootcamps: ResourceKind::Bootcamp.schema(),
            courses: ResourceKind::Course.schema(),
            reviews: ResourceKind::Review.schema(),
        }
    }

    fn schema(&self, kind: ResourceKind) -> &CollectionSchema {
        match kind {
            ResourceKind::Bootcamp => &self.bootcamps,
            ResourceKind::Course => &self.courses,
            ResourceKind::Review => &self.reviews,
        }
    }

    /// Declares every unique index the schemas require.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    pub async fn initialize(&self) -> StoreResult<()> {
        for kind in ResourceKind::ALL {
            let schema = self.schema(kind);
            for fields in schema.unique_indexes() {
                self.store
                    .ensure_unique_index(&schema.collection, &fields)
                    .await?;
            }
        }
        Ok(())
    }

    /// Fetches one record.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if `id` does not exist.
    pub async fn get(&self, kind: ResourceKind, id: &str) -> ApiResult<Document> {
        self.store
            .get(kind.collection(), id)
            .await?
            .ok_or_else(|| ApiError::missing(kind.label(), id))
    }

    /// Creates a record owned by the caller.
    ///
    /// Dependent resources are created under `parent_id`, which must name an
    /// existing bootcamp.
    ///
    /// # Errors
    ///
    /// Authorization, validation, uniqueness and storage failures.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        parent_id: Option<&str>,
        body: Document,
    ) -> ApiResult<Document> {
        let principal = authorize(ctx, kind)?;
        let mut doc = self.clean_input(kind, body);

        if let Some(parent_ref) = kind.parent_ref() {
            let parent_id = parent_id
                .ok_or_else(|| ApiError::BadRequest(format!("A {} needs a bootcamp", kind.label())))?;
            let parent = self.get(ResourceKind::Bootcamp, parent_id).await?;
            if kind == ResourceKind::Course && !principal.can_modify(&parent) {
                return Err(ApiError::Forbidden(format!(
                    "User {} is not authorized to add a course to bootcamp {parent_id}",
                    principal.id
                )));
            }
            doc.insert(parent_ref.to_string(), Value::String(parent_id.to_string()));
        }

        if kind == ResourceKind::Bootcamp && !principal.is_admin() {
            let mine = FilterNode::from_terms([FilterTerm::eq(USER_FIELD, principal.id.clone().into())]);
            if self.store.count(kind.collection(), &mine).await? > 0 {
                return Err(ApiError::BadRequest(format!(
                    "The user with ID {} has already published a bootcamp",
                    principal.id
                )));
            }
        }

        doc.insert(USER_FIELD.to_string(), Value::String(principal.id.clone()));
        let schema = self.schema(kind);
        schema.apply_defaults(&mut doc, Utc::now());
        schema.validate(&doc).into_result().map_err(ApiError::Validation)?;

        let created = self.store.insert(kind.collection(), doc).await?;
        self.refresh_parent(kind, &created).await;

        info!(
            request_id = %ctx.request_id,
            resource = kind.label(),
            id = document_id(&created).unwrap_or_default(),
            user = %principal.id,
            "resource created"
        );
        Ok(created)
    }

    /// Applies a partial update. Ownership and parent references never change.
    ///
    /// # Errors
    ///
    /// Authorization, not-found, validation, uniqueness and storage failures.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        id: &str,
        body: Document,
    ) -> ApiResult<Document> {
        let principal = authorize(ctx, kind)?;
        let existing = self.get(kind, id).await?;
        ensure_can_modify(principal, kind, &existing, "update")?;

        let mut patch = self.clean_input(kind, body);
        patch.remove(USER_FIELD);
        if let Some(parent_ref) = kind.parent_ref() {
            patch.remove(parent_ref);
        }

        let mut merged = existing;
        merged.extend(patch.clone());
        self.schema(kind)
            .validate(&merged)
            .into_result()
            .map_err(ApiError::Validation)?;

        let updated = self
            .store
            .update(kind.collection(), id, patch)
            .await?
            .ok_or_else(|| ApiError::missing(kind.label(), id))?;
        self.refresh_parent(kind, &updated).await;

        info!(request_id = %ctx.request_id, resource = kind.label(), id, "resource updated");
        Ok(updated)
    }

    /// Deletes a record. Deleting a bootcamp also deletes its courses and reviews.
    ///
    /// # Errors
    ///
    /// Authorization, not-found and storage failures.
    pub async fn delete(&self, ctx: &RequestContext, kind: ResourceKind, id: &str) -> ApiResult<()> {
        let principal = authorize(ctx, kind)?;
        let existing = self.get(kind, id).await?;
        ensure_can_modify(principal, kind, &existing, "delete")?;

        if self.store.delete(kind.collection(), id).await?.is_none() {
            return Err(ApiError::missing(kind.label(), id));
        }

        if kind == ResourceKind::Bootcamp {
            for dependent in [ResourceKind::Course, ResourceKind::Review] {
                if let Some(parent_ref) = dependent.parent_ref() {
                    let scope = FilterNode::from_terms([FilterTerm::eq(parent_ref, id.into())]);
                    let removed = self.store.delete_many(dependent.collection(), &scope).await?;
                    info!(bootcamp = id, resource = dependent.label(), removed, "cascade delete");
                }
            }
        }
        self.refresh_parent(kind, &existing).await;

        info!(request_id = %ctx.request_id, resource = kind.label(), id, "resource deleted");
        Ok(())
    }

    fn clean_input(&self, kind: ResourceKind, mut body: Document) -> Document {
        strip_operator_keys(&mut body);
        escape_markup(&mut body);
        self.schema(kind).sanitize_input(body)
    }

    /// Recomputes the parent aggregate `doc` feeds, if any. Never fails.
    async fn refresh_parent(&self, kind: ResourceKind, doc: &Document) {
        let (Some(rule), Some(parent_ref)) = (kind.aggregate(), kind.parent_ref()) else {
            return;
        };
        if let Some(parent_id) = doc.get(parent_ref).and_then(Value::as_str) {
            self.recalculator.refresh(rule, parent_id).await;
        }
    }
}

/// Resolves the caller and checks they may write `kind`.
fn authorize(ctx: &RequestContext, kind: ResourceKind) -> ApiResult<&Principal> {
    let principal = ctx.principal.as_ref().ok_or(ApiError::Unauthenticated)?;
    ctx.principal_with_role(kind.writer_roles()).ok_or_else(|| {
        ApiError::Forbidden(format!(
            "User role {} is not authorized to access this route",
            principal.role
        ))
    })
}

fn ensure_can_modify(
    principal: &Principal,
    kind: ResourceKind,
    doc: &Document,
    action: &str,
) -> ApiResult<()> {
    if principal.can_modify(doc) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "User {} is not authorized to {action} this {}",
            principal.id,
            kind.label()
        )))
    }
}

#[cfg(test)]
mod tests {
    use devcamper_core::{translate, QueryParams};
    use serde_json::json;

    use super::*;
    use crate::service::ResultExecutor;
    use crate::storage::{FindSpec, MemoryStore};

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn as_user(id: &str, role: Role) -> RequestContext {
        RequestContext::authenticated("req-1", Principal::new(id, role))
    }

    async fn service() -> (ResourceService, Arc<dyn DocumentStore>) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let service = ResourceService::new(
            Arc::clone(&store),
            AggregateRecalculator::new(Arc::clone(&store)),
        );
        service.initialize().await.unwrap();
        (service, store)
    }

    fn bootcamp_body(name: &str) -> Document {
        doc(json!({
            "name": name,
            "description": "Full stack web development",
            "careers": ["Web Development"],
        }))
    }

    fn review_body(rating: i64) -> Document {
        doc(json!({"title": "Solid", "text": "Learned a lot", "rating": rating}))
    }

    async fn bootcamp(service: &ResourceService, owner: &str) -> String {
        let created = service
            .create(&as_user(owner, Role::Publisher), ResourceKind::Bootcamp, None, bootcamp_body(owner))
            .await
            .unwrap();
        document_id(&created).unwrap().to_string()
    }

    async fn average_rating(service: &ResourceService, camp: &str) -> Value {
        service.get(ResourceKind::Bootcamp, camp).await.unwrap()["averageRating"].clone()
    }

    #[tokio::test]
    async fn create_applies_owner_and_defaults() {
        let (service, _) = service().await;
        let created = service
            .create(&as_user("p1", Role::Publisher), ResourceKind::Bootcamp, None, bootcamp_body("Devworks"))
            .await
            .unwrap();
        assert_eq!(created["user"], json!("p1"));
        assert_eq!(created["photo"], json!("no-photo.jpg"));
        assert_eq!(created["housing"], json!(false));
        assert!(created["createdAt"].is_string());
    }

    #[tokio::test]
    async fn client_dates_with_mixed_offsets_sort_chronologically() {
        let (service, store) = service().await;
        for (owner, stamp) in [
            ("p1", "2024-01-01T00:00:00Z"),
            ("p2", "2024-01-01T00:00:00.500Z"),
            ("p3", "2024-01-01T03:00:00+05:00"),
        ] {
            let mut body = bootcamp_body(owner);
            body.insert("createdAt".into(), json!(stamp));
            service
                .create(&as_user(owner, Role::Publisher), ResourceKind::Bootcamp, None, body)
                .await
                .unwrap();
        }

        let page = ResultExecutor::new(store)
            .execute("bootcamps", &translate(&QueryParams::new()))
            .await
            .unwrap();
        let stamps: Vec<&str> = page.items.iter().map(|d| d["createdAt"].as_str().unwrap()).collect();
        assert_eq!(
            stamps,
            vec![
                "2024-01-01T00:00:00.500Z",
                "2024-01-01T00:00:00.000Z",
                "2023-12-31T22:00:00.000Z",
            ]
        );
    }

    #[tokio::test]
    async fn markup_in_bodies_is_escaped_before_storage() {
        let (service, _) = service().await;
        let mut body = bootcamp_body("p1");
        body.insert("description".into(), json!("<img src=x onerror=alert(1)>"));
        let created = service
            .create(&as_user("p1", Role::Publisher), ResourceKind::Bootcamp, None, body)
            .await
            .unwrap();
        assert_eq!(created["description"], json!("&lt;img src=x onerror=alert(1)>"));
    }

    #[tokio::test]
    async fn anonymous_and_wrong_role_writes_are_rejected() {
        let (service, _) = service().await;
        let err = service
            .create(&RequestContext::anonymous("r"), ResourceKind::Bootcamp, None, bootcamp_body("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));

        let err = service
            .create(&as_user("u1", Role::User), ResourceKind::Bootcamp, None, bootcamp_body("a"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User role user is not authorized to access this route");
    }

    #[tokio::test]
    async fn validation_failures_list_every_message() {
        let (service, _) = service().await;
        let camp = bootcamp(&service, "p1").await;
        let err = service
            .create(&as_user("u1", Role::User), ResourceKind::Review, Some(&camp), doc(json!({"rating": 11})))
            .await
            .unwrap_err();
        let ApiError::Validation(messages) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(
            messages,
            vec![
                "Please add a title for the review.".to_string(),
                "Please add some text.".to_string(),
                "rating must be between 1 and 10".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn second_review_by_same_user_is_a_duplicate() {
        let (service, _) = service().await;
        let camp = bootcamp(&service, "p1").await;
        let reviewer = as_user("u1", Role::User);
        service
            .create(&reviewer, ResourceKind::Review, Some(&camp), review_body(8))
            .await
            .unwrap();
        let err = service
            .create(&reviewer, ResourceKind::Review, Some(&camp), review_body(3))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Duplicate));
    }

    #[tokio::test]
    async fn review_on_missing_bootcamp_is_not_found() {
        let (service, _) = service().await;
        let err = service
            .create(&as_user("u1", Role::User), ResourceKind::Review, Some("nope"), review_body(8))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No bootcamp with the id of nope");
    }

    #[tokio::test]
    async fn average_rating_tracks_review_writes() {
        let (service, _) = service().await;
        let camp = bootcamp(&service, "p1").await;

        let first = service
            .create(&as_user("u1", Role::User), ResourceKind::Review, Some(&camp), review_body(8))
            .await
            .unwrap();
        assert_eq!(average_rating(&service, &camp).await, json!(8.0));

        service
            .create(&as_user("u2", Role::User), ResourceKind::Review, Some(&camp), review_body(4))
            .await
            .unwrap();
        assert_eq!(average_rating(&service, &camp).await, json!(6.0));

        service
            .delete(&as_user("u1", Role::User), ResourceKind::Review, document_id(&first).unwrap())
            .await
            .unwrap();
        assert_eq!(average_rating(&service, &camp).await, json!(4.0));
    }

    #[tokio::test]
    async fn review_update_recomputes_average() {
        let (service, _) = service().await;
        let camp = bootcamp(&service, "p1").await;
        let review = service
            .create(&as_user("u1", Role::User), ResourceKind::Review, Some(&camp), review_body(8))
            .await
            .unwrap();
        service
            .update(
                &as_user("u1", Role::User),
                ResourceKind::Review,
                document_id(&review).unwrap(),
                doc(json!({"rating": 2, "bootcamp": "elsewhere", "user": "u9"})),
            )
            .await
            .unwrap();
        assert_eq!(average_rating(&service, &camp).await, json!(2.0));
        let stored = service.get(ResourceKind::Review, document_id(&review).unwrap()).await.unwrap();
        assert_eq!(stored["bootcamp"], json!(camp));
        assert_eq!(stored["user"], json!("u1"));
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_modify() {
        let (service, _) = service().await;
        let camp = bootcamp(&service, "p1").await;

        let err = service
            .update(&as_user("p2", Role::Publisher), ResourceKind::Bootcamp, &camp, doc(json!({"phone": "1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let updated = service
            .update(&as_user("root", Role::Admin), ResourceKind::Bootcamp, &camp, doc(json!({"phone": "1"})))
            .await
            .unwrap();
        assert_eq!(updated["phone"], json!("1"));
    }

    #[tokio::test]
    async fn course_writes_require_bootcamp_ownership_and_feed_average_cost() {
        let (service, _) = service().await;
        let camp = bootcamp(&service, "p1").await;
        let course = |tuition: i64| {
            doc(json!({
                "title": "Front End",
                "description": "HTML, CSS, JS",
                "weeks": "8",
                "tuition": tuition,
                "minimumSkill": "beginner",
            }))
        };

        let err = service
            .create(&as_user("p2", Role::Publisher), ResourceKind::Course, Some(&camp), course(8000))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let owner = as_user("p1", Role::Publisher);
        service.create(&owner, ResourceKind::Course, Some(&camp), course(8000)).await.unwrap();
        service.create(&owner, ResourceKind::Course, Some(&camp), course(10001)).await.unwrap();
        let stored = service.get(ResourceKind::Bootcamp, &camp).await.unwrap();
        assert_eq!(stored["averageCost"], json!(9010.0));
    }

    #[tokio::test]
    async fn publisher_may_own_a_single_bootcamp() {
        let (service, _) = service().await;
        bootcamp(&service, "p1").await;
        let err = service
            .create(&as_user("p1", Role::Publisher), ResourceKind::Bootcamp, None, bootcamp_body("Second"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "The user with ID p1 has already published a bootcamp");
    }

    #[tokio::test]
    async fn deleting_a_bootcamp_cascades_to_dependents() {
        let (service, store) = service().await;
        let camp = bootcamp(&service, "p1").await;
        service
            .create(&as_user("u1", Role::User), ResourceKind::Review, Some(&camp), review_body(8))
            .await
            .unwrap();

        service.delete(&as_user("p1", Role::Publisher), ResourceKind::Bootcamp, &camp).await.unwrap();
        assert!(store.find("reviews", &FindSpec::default()).await.unwrap().is_empty());
        let err = service.get(ResourceKind::Bootcamp, &camp).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn operator_keys_in_bodies_are_dropped() {
        let (service, _) = service().await;
        let mut body = bootcamp_body("Devworks");
        body.insert("$where".into(), json!("1"));
        let created = service
            .create(&as_user("p1", Role::Publisher), ResourceKind::Bootcamp, None, body)
            .await
            .unwrap();
        assert!(!created.contains_key("$where"));
    }
}
