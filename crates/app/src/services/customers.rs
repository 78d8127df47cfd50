//! Customer overview: a shop's uploads grouped by submitter email.

use gallery_flow_core::{ContentType, ModerationStatus};
use serde::{Deserialize, Serialize};

use crate::models::UploadDetail;

pub const PAGE_SIZE: usize = 10;

/// One submitter and what they have uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub email: String,
    pub customer_id: String,
    pub name: Option<String>,
    /// Content kinds uploaded against, in first-seen order.
    pub types: Vec<String>,
    /// Distinct upload statuses, in first-seen order.
    pub status: Vec<ModerationStatus>,
    pub uploads: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerQuery {
    pub search: Option<String>,
    pub page: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPage {
    pub customers: Vec<CustomerSummary>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

/// Display name of the kind an upload belongs to. Event-linked article
/// uploads show as `blog`, the kind the merchant picked.
fn upload_kind(detail: &UploadDetail) -> Option<&'static str> {
    if let Some(kind) = detail.upload.item_type {
        return Some(kind.as_str());
    }
    detail.event.as_ref().map(|event| match event.kind {
        ContentType::Article => ContentType::Blog.as_str(),
        other => other.as_str(),
    })
}

/// Group uploads by email, keeping the order customers first appear in.
#[must_use]
pub fn summarize(uploads: &[UploadDetail]) -> Vec<CustomerSummary> {
    let mut summaries: Vec<CustomerSummary> = Vec::new();

    for detail in uploads {
        let upload = &detail.upload;
        let index = match summaries.iter().position(|c| c.email == upload.email) {
            Some(index) => index,
            None => {
                summaries.push(CustomerSummary {
                    email: upload.email.clone(),
                    customer_id: upload.customer_id.clone(),
                    name: upload.name.clone(),
                    types: Vec::new(),
                    status: Vec::new(),
                    uploads: 0,
                });
                summaries.len() - 1
            }
        };

        let summary = &mut summaries[index];
        summary.uploads += 1;
        if summary.name.is_none() {
            summary.name.clone_from(&upload.name);
        }
        if let Some(kind) = upload_kind(detail)
            && !summary.types.iter().any(|t| t == kind)
        {
            summary.types.push(kind.to_string());
        }
        if !summary.status.contains(&upload.status) {
            summary.status.push(upload.status);
        }
    }

    summaries
}

/// Filter by a case-insensitive email substring and cut one page (1-based).
#[must_use]
pub fn paginate(summaries: Vec<CustomerSummary>, query: &CustomerQuery) -> CustomerPage {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let matching: Vec<CustomerSummary> = summaries
        .into_iter()
        .filter(|c| {
            needle
                .as_ref()
                .is_none_or(|n| c.email.to_lowercase().contains(n))
        })
        .collect();

    let total = matching.len();
    let total_pages = total.div_ceil(PAGE_SIZE).max(1);
    let page = query.page.unwrap_or(1).max(1);

    let customers = matching
        .into_iter()
        .skip((page - 1).saturating_mul(PAGE_SIZE))
        .take(PAGE_SIZE)
        .collect();

    CustomerPage {
        customers,
        total,
        page,
        total_pages,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use gallery_flow_core::{EventId, ShopDomain, UploadId};

    use super::*;
    use crate::models::{Event, GalleryUpload};

    fn shop() -> ShopDomain {
        ShopDomain::parse("demo.myshopify.com").unwrap()
    }

    fn item_upload(email: &str, kind: ContentType, status: ModerationStatus) -> UploadDetail {
        UploadDetail {
            upload: GalleryUpload {
                id: UploadId::new(),
                shop: shop(),
                customer_id: "gid://shopify/Customer/1".to_string(),
                name: None,
                email: email.to_string(),
                status,
                event_id: None,
                item_id: Some("gid://shopify/Product/1".to_string()),
                item_type: Some(kind),
                item_name: Some("Mug".to_string()),
                created_at: Utc::now(),
            },
            images: Vec::new(),
            event: None,
        }
    }

    fn event_upload(email: &str, kind: ContentType) -> UploadDetail {
        let event = Event {
            id: EventId::new(),
            shop: shop(),
            name: "Trip".to_string(),
            kind,
            shopify_id: "gid://shopify/Article/2".to_string(),
            date: None,
            created_at: Utc::now(),
        };
        let mut detail = item_upload(email, ContentType::Product, ModerationStatus::Pending);
        detail.upload.item_id = None;
        detail.upload.item_type = None;
        detail.upload.item_name = None;
        detail.upload.event_id = Some(event.id);
        detail.event = Some(event);
        detail
    }

    #[test]
    fn test_summarize_groups_by_email_in_order() {
        let uploads = vec![
            item_upload("b@x.com", ContentType::Product, ModerationStatus::Approved),
            item_upload("a@x.com", ContentType::Page, ModerationStatus::Pending),
            item_upload("b@x.com", ContentType::Product, ModerationStatus::Declined),
            event_upload("b@x.com", ContentType::Article),
        ];

        let summaries = summarize(&uploads);
        assert_eq!(summaries.len(), 2);

        let b = &summaries[0];
        assert_eq!(b.email, "b@x.com");
        assert_eq!(b.uploads, 3);
        assert_eq!(b.types, vec!["product", "blog"]);
        assert_eq!(
            b.status,
            vec![
                ModerationStatus::Approved,
                ModerationStatus::Declined,
                ModerationStatus::Pending
            ]
        );

        assert_eq!(summaries[1].email, "a@x.com");
        assert_eq!(summaries[1].types, vec!["page"]);
    }

    #[test]
    fn test_paginate_search_is_case_insensitive() {
        let uploads = vec![
            item_upload("Jane@Shop.com", ContentType::Product, ModerationStatus::Pending),
            item_upload("bob@other.com", ContentType::Product, ModerationStatus::Pending),
        ];
        let page = paginate(
            summarize(&uploads),
            &CustomerQuery {
                search: Some("jane@".to_string()),
                page: None,
            },
        );
        assert_eq!(page.total, 1);
        assert_eq!(page.customers[0].email, "Jane@Shop.com");
    }

    #[test]
    fn test_paginate_pages_of_ten() {
        let uploads: Vec<UploadDetail> = (0..23)
            .map(|i| item_upload(&format!("c{i}@x.com"), ContentType::Product, ModerationStatus::Pending))
            .collect();

        let first = paginate(summarize(&uploads), &CustomerQuery::default());
        assert_eq!((first.page, first.total_pages, first.customers.len()), (1, 3, 10));

        let last = paginate(
            summarize(&uploads),
            &CustomerQuery {
                search: None,
                page: Some(3),
            },
        );
        assert_eq!(last.customers.len(), 3);
        assert_eq!(last.customers[0].email, "c20@x.com");

        let beyond = paginate(
            summarize(&uploads),
            &CustomerQuery {
                search: None,
                page: Some(9),
            },
        );
        assert!(beyond.customers.is_empty());
    }

    #[test]
    fn test_paginate_empty() {
        let page = paginate(Vec::new(), &CustomerQuery::default());
        assert_eq!((page.total, page.total_pages), (0, 1));
    }
}
