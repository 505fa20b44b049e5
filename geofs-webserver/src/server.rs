//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! HTTP front-end: the `/wfs` endpoint plus the Basic-auth protected
//! admin REST API for layers, imports and symbology rules.

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{middleware, rt, web, App, HttpRequest, HttpResponse, HttpServer};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use geofs_core::core::config::ApplicationCfg;
use geofs_core::core::error::ServiceError;
use geofs_core::core::layer::{Layer, SymbologyRule};
use geofs_core::geom::{geojson, wkb};
use geofs_core::repo;
use geofs_core::repo::DbPool;
use geofs_service::ingest;
use geofs_service::kvp::{self, WfsRequest};
use geofs_service::transaction;
use geofs_service::wfs;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

const XML_CONTENT_TYPE: &str = "application/xml; charset=UTF-8";
const GML_CONTENT_TYPE: &str = "application/gml+xml; version=3.2; charset=UTF-8";

const ALLOWED_SUFFIXES: [&str; 5] = ["geojson", "json", "zip", "gpkg", "csv"];

/// Shared application state; every request checks out its own store
/// connection from the pool.
pub struct AppState {
    pub pool: DbPool,
    pub config: ApplicationCfg,
}

// ── WFS endpoint ─────────────────────────────────────────────────────

async fn wfs_endpoint(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> HttpResponse {
    let pairs = match web::Query::<Vec<(String, String)>>::from_query(req.query_string()) {
        Ok(pairs) => pairs.into_inner(),
        Err(_) => Vec::new(),
    };
    let params = kvp::WfsParams::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    let request = kvp::dispatch(&params);

    let mut conn = match state.pool.get() {
        Ok(conn) => conn,
        Err(e) => return internal_error(&e.to_string()),
    };

    // XML POST bodies carry transactions even without REQUEST=Transaction
    if req.method() == actix_web::http::Method::POST {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        let is_transaction = request == WfsRequest::Transaction;
        if (content_type.contains("xml") || is_transaction)
            && !body.is_empty()
            && (is_transaction || body.windows(11).any(|w| w == &b"Transaction"[..]))
        {
            let xml = transaction::execute_transaction(&mut conn, &body);
            return HttpResponse::Ok().content_type(XML_CONTENT_TYPE).body(xml);
        }
    }

    match request {
        WfsRequest::GetCapabilities => {
            match wfs::build_capabilities(&conn, &state.config.service) {
                Ok(xml) => HttpResponse::Ok().content_type(XML_CONTENT_TYPE).body(xml),
                Err(e) => internal_error(&e.to_string()),
            }
        }
        WfsRequest::DescribeFeatureType => {
            match wfs::build_describe(&conn, params.typenames.as_deref()) {
                Ok(xml) => HttpResponse::Ok().content_type(XML_CONTENT_TYPE).body(xml),
                Err(ServiceError::NotFound(what)) => {
                    HttpResponse::NotFound().json(json!({ "detail": format!("{} not found", what) }))
                }
                Err(e) => internal_error(&e.to_string()),
            }
        }
        WfsRequest::GetFeature { json } => {
            let typenames = match &params.typenames {
                Some(names) => names.clone(),
                None => {
                    return bad_request("TYPENAMES parameter is required for GetFeature");
                }
            };
            let bbox = match &params.bbox {
                Some(raw) => match kvp::parse_bbox(raw) {
                    Ok(ext) => Some(ext),
                    Err(e) => return bad_request(&e.to_string()),
                },
                None => None,
            };
            let query = wfs::FeatureQuery {
                bbox,
                count: params.count,
                startindex: params.startindex,
                max_features: state.config.service.max_features_per_request,
            };
            if json {
                match wfs::build_get_feature_geojson(&conn, &typenames, &query) {
                    Ok(doc) => HttpResponse::Ok().json(doc),
                    Err(e) => internal_error(&e.to_string()),
                }
            } else {
                match wfs::build_get_feature_gml(&conn, &typenames, &query) {
                    Ok(xml) => HttpResponse::Ok().content_type(GML_CONTENT_TYPE).body(xml),
                    Err(e) => internal_error(&e.to_string()),
                }
            }
        }
        WfsRequest::Transaction => bad_request("Transaction requires XML POST body"),
        WfsRequest::Unknown(verb) => bad_request(&format!(
            "Unknown REQUEST: '{}'. Supported: GetCapabilities, DescribeFeatureType, GetFeature, Transaction",
            verb
        )),
    }
}

// ── Admin: layers ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LayerCreate {
    name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct LayerUpdate {
    title: Option<String>,
    description: Option<String>,
}

fn layer_json(layer: &Layer) -> Value {
    let bbox = layer
        .bbox
        .map(|ext| json!([ext.minx, ext.miny, ext.maxx, ext.maxy]))
        .unwrap_or(Value::Null);
    json!({
        "id": layer.id,
        "name": layer.name,
        "title": layer.title,
        "description": layer.description,
        "geometry_type": layer.geometry_type,
        "srid": layer.srid,
        "bbox": bbox,
        "feature_count": layer.feature_count,
        "attribute_schema": layer.attribute_schema,
        "created_at": layer.created_at,
        "updated_at": layer.updated_at,
    })
}

fn valid_layer_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

async fn list_layers(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    guarded(&req, &state, |conn| {
        let layers = repo::list_layers_recent(conn)?;
        Ok(HttpResponse::Ok().json(layers.iter().map(layer_json).collect::<Vec<_>>()))
    })
}

async fn create_layer(
    req: HttpRequest,
    body: web::Json<LayerCreate>,
    state: web::Data<AppState>,
) -> HttpResponse {
    guarded(&req, &state, |conn| {
        if !valid_layer_name(&body.name) {
            return Ok(HttpResponse::UnprocessableEntity().json(json!({
                "detail": "Layer name must match [A-Za-z0-9_-]+"
            })));
        }
        match repo::create_layer(conn, &body.name, &body.title, &body.description) {
            Ok(layer) => Ok(HttpResponse::Created().json(layer_json(&layer))),
            Err(ServiceError::Conflict(name)) => Ok(HttpResponse::Conflict().json(json!({
                "detail": format!("Layer name '{}' already exists", name)
            }))),
            Err(e) => Err(e),
        }
    })
}

async fn get_layer(
    req: HttpRequest,
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> HttpResponse {
    guarded(&req, &state, |conn| {
        let layer = repo::layer_by_id(conn, *path)?;
        Ok(HttpResponse::Ok().json(layer_json(&layer)))
    })
}

async fn patch_layer(
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<LayerUpdate>,
    state: web::Data<AppState>,
) -> HttpResponse {
    guarded(&req, &state, |conn| {
        let layer = repo::update_layer_meta(
            conn,
            *path,
            body.title.as_deref(),
            body.description.as_deref(),
        )?;
        Ok(HttpResponse::Ok().json(layer_json(&layer)))
    })
}

async fn delete_layer(
    req: HttpRequest,
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> HttpResponse {
    guarded(&req, &state, |conn| {
        repo::delete_layer(conn, *path)?;
        Ok(HttpResponse::NoContent().finish())
    })
}

#[derive(Deserialize)]
struct PreviewQuery {
    max: Option<u32>,
}

async fn feature_preview(
    req: HttpRequest,
    path: web::Path<i64>,
    query: web::Query<PreviewQuery>,
    state: web::Data<AppState>,
) -> HttpResponse {
    guarded(&req, &state, |conn| {
        repo::layer_by_id(conn, *path)?;
        let max = query.max.unwrap_or(1000).min(5000);
        let features = repo::features_preview(conn, *path, max)?;
        let collection: Vec<Value> = features
            .iter()
            .map(|feat| {
                let geometry = feat
                    .geometry
                    .as_deref()
                    .and_then(|buf| wkb::decode(buf).ok())
                    .map(|geom| geojson::to_geojson(&geom))
                    .unwrap_or(Value::Null);
                json!({
                    "type": "Feature",
                    "id": feat.fid,
                    "geometry": geometry,
                    "properties": geofs_core::core::feature::props_to_json(&feat.properties),
                })
            })
            .collect();
        Ok(HttpResponse::Ok().json(json!({
            "type": "FeatureCollection",
            "features": collection,
        })))
    })
}

// ── Admin: import ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ImportQuery {
    filename: String,
    srid: Option<i32>,
    lat_field: Option<String>,
    lon_field: Option<String>,
    #[serde(default)]
    replace_existing: bool,
}

/// Upload staged at `uploads_dir/layer_<id>_<filename>`; removed on every
/// exit path.
struct TempUpload(PathBuf);

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("cannot remove upload {}: {}", self.0.display(), e);
            }
        }
    }
}

async fn import_layer_file(
    req: HttpRequest,
    path: web::Path<i64>,
    query: web::Query<ImportQuery>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> HttpResponse {
    let layer_id = *path;
    guarded(&req, &state, |conn| {
        repo::layer_by_id(conn, layer_id)?;

        let filename = Path::new(&query.filename)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let suffix = Path::new(&filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !ALLOWED_SUFFIXES.contains(&suffix.as_str()) {
            return Ok(HttpResponse::BadRequest().json(json!({
                "detail": format!(
                    "Unsupported file type '.{}'. Allowed: .csv, .geojson, .gpkg, .json, .zip",
                    suffix
                )
            })));
        }

        let uploads_dir = Path::new(&state.config.datasource.uploads_dir);
        fs::create_dir_all(uploads_dir)?;
        let upload = TempUpload(uploads_dir.join(format!("layer_{}_{}", layer_id, filename)));
        fs::write(&upload.0, &body)?;

        let result = ingest::import_file(
            conn,
            &upload.0,
            layer_id,
            query.srid.unwrap_or(4326),
            query.lat_field.as_deref().filter(|f| !f.is_empty()),
            query.lon_field.as_deref().filter(|f| !f.is_empty()),
            query.replace_existing,
        );
        match result {
            Ok(result) => Ok(HttpResponse::Ok().json(json!({
                "features_imported": result.imported,
                "features_failed": result.failed,
                "errors": result.errors,
                "bbox": result
                    .bbox
                    .map(|ext| json!([ext.minx, ext.miny, ext.maxx, ext.maxy]))
                    .unwrap_or(Value::Null),
            }))),
            Err(ServiceError::NotFound(what)) => Ok(HttpResponse::NotFound()
                .json(json!({ "detail": format!("{} not found", what) }))),
            Err(e @ ServiceError::Format(_)) | Err(e @ ServiceError::Geometry(_)) => {
                Ok(HttpResponse::UnprocessableEntity().json(json!({ "detail": e.to_string() })))
            }
            Err(e) => Err(e),
        }
    })
}

// ── Admin: symbology ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct RuleBody {
    #[serde(default)]
    rule_order: i64,
    #[serde(default)]
    label: String,
    filter_field: Option<String>,
    #[serde(default = "default_operator")]
    filter_operator: String,
    filter_value: Option<String>,
    #[serde(default = "default_fill_color")]
    fill_color: String,
    #[serde(default = "default_fill_opacity")]
    fill_opacity: f64,
    #[serde(default = "default_stroke_color")]
    stroke_color: String,
    #[serde(default = "default_stroke_width")]
    stroke_width: f64,
    #[serde(default = "default_point_radius")]
    point_radius: f64,
    #[serde(default)]
    is_default: bool,
}

fn default_operator() -> String {
    "eq".to_string()
}
fn default_fill_color() -> String {
    "#3388ff".to_string()
}
fn default_fill_opacity() -> f64 {
    0.6
}
fn default_stroke_color() -> String {
    "#ffffff".to_string()
}
fn default_stroke_width() -> f64 {
    1.5
}
fn default_point_radius() -> f64 {
    6.0
}

impl RuleBody {
    fn into_rule(self, id: i64, layer_id: i64) -> SymbologyRule {
        SymbologyRule {
            id,
            layer_id,
            rule_order: self.rule_order,
            label: self.label,
            filter_field: self.filter_field,
            filter_operator: self.filter_operator,
            filter_value: self.filter_value,
            fill_color: self.fill_color,
            fill_opacity: self.fill_opacity,
            stroke_color: self.stroke_color,
            stroke_width: self.stroke_width,
            point_radius: self.point_radius,
            is_default: self.is_default,
        }
    }
}

fn rule_json(rule: &SymbologyRule) -> Value {
    json!({
        "id": rule.id,
        "layer_id": rule.layer_id,
        "rule_order": rule.rule_order,
        "label": rule.label,
        "filter_field": rule.filter_field,
        "filter_operator": rule.filter_operator,
        "filter_value": rule.filter_value,
        "fill_color": rule.fill_color,
        "fill_opacity": rule.fill_opacity,
        "stroke_color": rule.stroke_color,
        "stroke_width": rule.stroke_width,
        "point_radius": rule.point_radius,
        "is_default": rule.is_default,
    })
}

async fn list_rules(
    req: HttpRequest,
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> HttpResponse {
    guarded(&req, &state, |conn| {
        repo::layer_by_id(conn, *path)?;
        let rules = repo::list_rules(conn, *path)?;
        Ok(HttpResponse::Ok().json(rules.iter().map(rule_json).collect::<Vec<_>>()))
    })
}

async fn create_rule(
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<RuleBody>,
    state: web::Data<AppState>,
) -> HttpResponse {
    guarded(&req, &state, |conn| {
        repo::layer_by_id(conn, *path)?;
        let rule = repo::create_rule(conn, &body.into_inner().into_rule(0, *path))?;
        Ok(HttpResponse::Created().json(rule_json(&rule)))
    })
}

async fn update_rule(
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<RuleBody>,
    state: web::Data<AppState>,
) -> HttpResponse {
    guarded(&req, &state, |conn| {
        let existing = repo::rule_by_id(conn, *path)?;
        let rule = repo::update_rule(
            conn,
            &body.into_inner().into_rule(existing.id, existing.layer_id),
        )?;
        Ok(HttpResponse::Ok().json(rule_json(&rule)))
    })
}

async fn delete_rule(
    req: HttpRequest,
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> HttpResponse {
    guarded(&req, &state, |conn| {
        repo::delete_rule(conn, *path)?;
        Ok(HttpResponse::NoContent().finish())
    })
}

#[derive(Deserialize)]
struct ReorderRequest {
    order: Vec<i64>,
}

async fn reorder_rules(
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<ReorderRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    guarded(&req, &state, |conn| {
        repo::layer_by_id(conn, *path)?;
        repo::reorder_rules(conn, *path, &body.order)?;
        let rules = repo::list_rules(conn, *path)?;
        Ok(HttpResponse::Ok().json(rules.iter().map(rule_json).collect::<Vec<_>>()))
    })
}

// ── Shared plumbing ──────────────────────────────────────────────────

/// Run an admin handler behind the Basic-auth gate with a pooled
/// connection, translating repository errors to HTTP statuses.
fn guarded<F>(req: &HttpRequest, state: &web::Data<AppState>, handler: F) -> HttpResponse
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<HttpResponse, ServiceError>,
{
    if !authorized(req, state) {
        return HttpResponse::Unauthorized()
            .insert_header((
                header::WWW_AUTHENTICATE,
                "Basic realm=\"GeoFeatureService Admin\"",
            ))
            .body("Unauthorized");
    }
    let mut conn = match state.pool.get() {
        Ok(conn) => conn,
        Err(e) => return internal_error(&e.to_string()),
    };
    match handler(&mut conn) {
        Ok(response) => response,
        Err(ServiceError::NotFound(what)) => {
            HttpResponse::NotFound().json(json!({ "detail": format!("{} not found", what) }))
        }
        Err(ServiceError::Conflict(name)) => HttpResponse::Conflict()
            .json(json!({ "detail": format!("Layer name '{}' already exists", name) })),
        Err(e) => internal_error(&e.to_string()),
    }
}

fn authorized(req: &HttpRequest, state: &web::Data<AppState>) -> bool {
    let expected = BASE64.encode(format!(
        "{}:{}",
        state.config.webserver.admin_user, state.config.webserver.admin_pass
    ));
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .map(|token| token == expected)
        .unwrap_or(false)
}

fn bad_request(detail: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "detail": detail }))
}

fn internal_error(detail: &str) -> HttpResponse {
    error!("internal error: {}", detail);
    HttpResponse::InternalServerError().json(json!({ "detail": "Internal server error" }))
}

// ── Startup ──────────────────────────────────────────────────────────

pub fn webserver(config: ApplicationCfg) -> std::io::Result<()> {
    let pool = repo::init_pool(&config.datasource.db_path).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::Other, format!("store init failed: {}", e))
    })?;
    fs::create_dir_all(&config.datasource.uploads_dir)?;

    let host = config
        .webserver
        .bind
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = config.webserver.port.unwrap_or(6767);
    let bind_addr = format!("{}:{}", host, port);
    info!("Serving WFS at http://{}/wfs", bind_addr);

    let state = web::Data::new(AppState { pool, config });

    rt::System::new().block_on(async move {
        HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .app_data(web::PayloadConfig::new(256 * 1024 * 1024))
                .wrap(middleware::Logger::default())
                .wrap(Cors::permissive())
                .route("/wfs", web::get().to(wfs_endpoint))
                .route("/wfs", web::post().to(wfs_endpoint))
                .service(
                    web::scope("/api/admin")
                        .route("/layers", web::get().to(list_layers))
                        .route("/layers", web::post().to(create_layer))
                        .route("/layers/{id}", web::get().to(get_layer))
                        .route("/layers/{id}", web::patch().to(patch_layer))
                        .route("/layers/{id}", web::delete().to(delete_layer))
                        .route(
                            "/layers/{id}/features/preview",
                            web::get().to(feature_preview),
                        )
                        .route("/layers/{id}/import", web::post().to(import_layer_file))
                        .route("/layers/{id}/symbology", web::get().to(list_rules))
                        .route("/layers/{id}/symbology", web::post().to(create_rule))
                        .route(
                            "/layers/{id}/symbology/reorder",
                            web::post().to(reorder_rules),
                        )
                        .route("/symbology/{rule_id}", web::put().to(update_rule))
                        .route("/symbology/{rule_id}", web::delete().to(delete_rule)),
                )
        })
        .bind(bind_addr)?
        .run()
        .await
    })
}
