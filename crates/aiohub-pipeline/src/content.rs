use crate::error::Result;
use sqlx::PgPool;
use uuid::Uuid;

/// Closed set of CMS tables the pipeline may read. Each variant maps to
/// its own typed query; table names never travel through query strings
/// as caller input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentTable {
    Posts,
    Services,
    Faqs,
    CaseStudies,
    Products,
}

impl ContentTable {
    pub const ALL: [ContentTable; 5] = [
        ContentTable::Posts,
        ContentTable::Services,
        ContentTable::Faqs,
        ContentTable::CaseStudies,
        ContentTable::Products,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentTable::Posts => "posts",
            ContentTable::Services => "services",
            ContentTable::Faqs => "faqs",
            ContentTable::CaseStudies => "case_studies",
            ContentTable::Products => "products",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "posts" => Some(ContentTable::Posts),
            "services" => Some(ContentTable::Services),
            "faqs" => Some(ContentTable::Faqs),
            "case_studies" => Some(ContentTable::CaseStudies),
            "products" => Some(ContentTable::Products),
            _ => None,
        }
    }

    pub fn translatable_fields(&self) -> &'static [&'static str] {
        match self {
            ContentTable::Posts => &["title", "body", "excerpt"],
            ContentTable::Services => &["name", "description"],
            ContentTable::Faqs => &["question", "answer"],
            ContentTable::CaseStudies => &["title", "summary"],
            ContentTable::Products => &["name", "description"],
        }
    }
}

/// One content row with its translatable field values, in the order of
/// `translatable_fields()`.
#[derive(Debug, Clone)]
pub struct ContentRow {
    pub id: Uuid,
    pub fields: Vec<(&'static str, String)>,
}

#[derive(Clone)]
pub struct ContentRepo {
    pool: PgPool,
}

impl ContentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enumerate one table's rows for an organization. Read-only.
    pub async fn list_rows(
        &self,
        organization_id: Uuid,
        table: ContentTable,
    ) -> Result<Vec<ContentRow>> {
        let rows = match table {
            ContentTable::Posts => {
                let raw = sqlx::query_as::<_, (Uuid, String, String, String)>(
                    r#"
                    SELECT id, title, body, excerpt
                    FROM posts
                    WHERE organization_id = $1
                    ORDER BY created_at ASC
                    "#,
                )
                .bind(organization_id)
                .fetch_all(&self.pool)
                .await?;

                raw.into_iter()
                    .map(|(id, title, body, excerpt)| ContentRow {
                        id,
                        fields: vec![("title", title), ("body", body), ("excerpt", excerpt)],
                    })
                    .collect()
            }
            ContentTable::Services => {
                let raw = sqlx::query_as::<_, (Uuid, String, String)>(
                    r#"
                    SELECT id, name, description
                    FROM services
                    WHERE organization_id = $1
                    ORDER BY created_at ASC
                    "#,
                )
                .bind(organization_id)
                .fetch_all(&self.pool)
                .await?;

                raw.into_iter()
                    .map(|(id, name, description)| ContentRow {
                        id,
                        fields: vec![("name", name), ("description", description)],
                    })
                    .collect()
            }
            ContentTable::Faqs => {
                let raw = sqlx::query_as::<_, (Uuid, String, String)>(
                    r#"
                    SELECT id, question, answer
                    FROM faqs
                    WHERE organization_id = $1
                    ORDER BY created_at ASC
                    "#,
                )
                .bind(organization_id)
                .fetch_all(&self.pool)
                .await?;

                raw.into_iter()
                    .map(|(id, question, answer)| ContentRow {
                        id,
                        fields: vec![("question", question), ("answer", answer)],
                    })
                    .collect()
            }
            ContentTable::CaseStudies => {
                let raw = sqlx::query_as::<_, (Uuid, String, String)>(
                    r#"
                    SELECT id, title, summary
                    FROM case_studies
                    WHERE organization_id = $1
                    ORDER BY created_at ASC
                    "#,
                )
                .bind(organization_id)
                .fetch_all(&self.pool)
                .await?;

                raw.into_iter()
                    .map(|(id, title, summary)| ContentRow {
                        id,
                        fields: vec![("title", title), ("summary", summary)],
                    })
                    .collect()
            }
            ContentTable::Products => {
                let raw = sqlx::query_as::<_, (Uuid, String, String)>(
                    r#"
                    SELECT id, name, description
                    FROM products
                    WHERE organization_id = $1
                    ORDER BY created_at ASC
                    "#,
                )
                .bind(organization_id)
                .fetch_all(&self.pool)
                .await?;

                raw.into_iter()
                    .map(|(id, name, description)| ContentRow {
                        id,
                        fields: vec![("name", name), ("description", description)],
                    })
                    .collect()
            }
        };

        Ok(rows)
    }
}
