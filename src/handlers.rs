use actix_web::{get, http::header, post, web, HttpResponse};
use askama::Template;
use log::{info, warn};
use serde::Deserialize;

use crate::{
    fetcher::Fetcher,
    sampler::{run_sampling_pass, PassSummary},
    store::Store,
    structures::{
        errors::SitemetersError,
        model::{Site, SiteReport},
    },
};

const CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Per-request knobs taken from the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub fetch_concurrency: usize,
    pub recent_limit: i64,
}

#[derive(Debug, Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    reports: Vec<SiteReport>,
}

#[derive(Debug, Template)]
#[template(path = "site_list.html")]
struct SiteListTemplate {
    sites: Vec<Site>,
    messages: Vec<String>,
}

#[derive(Debug, Template)]
#[template(path = "result.html")]
struct ResultTemplate {
    message: &'static str,
    detail: String,
}

#[derive(Debug, Deserialize)]
pub struct SiteForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
}

fn render(template: &impl Template) -> Result<HttpResponse, SitemetersError> {
    Ok(HttpResponse::Ok()
        .content_type(CONTENT_TYPE)
        .body(template.render()?))
}

async fn site_list(
    store: &dyn Store,
    messages: Vec<String>,
) -> Result<HttpResponse, SitemetersError> {
    let sites = store.list_sites().await?;
    render(&SiteListTemplate { sites, messages })
}

#[get("/")]
pub async fn index_handler(
    store: web::Data<dyn Store>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, SitemetersError> {
    let mut reports = Vec::new();
    for site in store.list_sites().await? {
        let measurements = store
            .recent_measurements(&site.name, settings.recent_limit)
            .await?;
        reports.push(SiteReport { site, measurements });
    }
    render(&IndexTemplate { reports })
}

#[get("/site/")]
pub async fn site_list_handler(
    store: web::Data<dyn Store>,
) -> Result<HttpResponse, SitemetersError> {
    site_list(store.get_ref(), Vec::new()).await
}

#[post("/site/")]
pub async fn register_handler(
    store: web::Data<dyn Store>,
    form: web::Form<SiteForm>,
) -> Result<HttpResponse, SitemetersError> {
    let SiteForm { name, url } = form.into_inner();
    if name.trim().is_empty() || url.trim().is_empty() {
        return Ok(HttpResponse::SeeOther()
            .insert_header((header::LOCATION, "/site/"))
            .finish());
    }

    let message = match store.upsert_site(&name, &url).await {
        Ok(site) => {
            info!("Registered site {} ({})", site.name, site.permalink);
            format!("registered : {} : {}", site.name, site.permalink)
        }
        Err(SitemetersError::Validation(reason)) => {
            warn!("Rejected site {} ({}): {}", name, url, reason);
            format!("[RegisterError] {} : {} ({})", name, url, reason)
        }
        Err(e) => return Err(e),
    };
    site_list(store.get_ref(), vec![message]).await
}

#[post("/site/delete/")]
pub async fn delete_handler(
    store: web::Data<dyn Store>,
    body: web::Bytes,
) -> Result<HttpResponse, SitemetersError> {
    // `site_id` may repeat, which serde_urlencoded cannot collect.
    let ids: Vec<String> = url::form_urlencoded::parse(&body)
        .filter(|(key, _)| key == "site_id")
        .map(|(_, value)| value.into_owned())
        .collect();

    let messages = store
        .delete_sites(&ids)
        .await?
        .iter()
        .map(|outcome| outcome.message())
        .collect();
    site_list(store.get_ref(), messages).await
}

#[get("/site/fetch/")]
pub async fn fetch_handler(
    store: web::Data<dyn Store>,
    fetcher: web::Data<dyn Fetcher>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, SitemetersError> {
    let summary = run_sampling_pass(
        store.get_ref(),
        fetcher.get_ref(),
        settings.fetch_concurrency,
    )
    .await?;
    let detail = match summary {
        PassSummary::NothingToMeasure => String::new(),
        PassSummary::Completed {
            attempted,
            recorded,
        } => format!("{} sites attempted, {} measurements recorded", attempted, recorded),
    };
    render(&ResultTemplate {
        message: summary.message(),
        detail,
    })
}

#[get("/health")]
pub async fn health_handler() -> HttpResponse {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index_handler)
        .service(site_list_handler)
        .service(register_handler)
        .service(delete_handler)
        .service(fetch_handler)
        .service(health_handler);
}
