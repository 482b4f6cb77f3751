//! End-to-end test of the session driver against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives a `Session` over
//! real HTTP using ureq. Bulk writes and paged searches cross the server's
//! ceilings, so this checks that segmentation and paging keep every
//! request within them and reassemble the results in order.

use serde_json::{json, Value};
use workfront_core::{
    ApiError, ClientConfig, Credentials, HttpMethod, HttpRequest, HttpResponse, Item,
    ParameterMap, Record, SearchRequest, Session, Transport, WorkfrontClient,
};

/// Executes requests with ureq.
///
/// ureq's status-as-error behavior is disabled so 4xx/5xx responses come
/// back as data and the core client interprets them.
struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&mut self, req: HttpRequest) -> Result<HttpResponse, ApiError> {
        let body = req.body.unwrap_or_default();
        let result = match req.method {
            HttpMethod::Get => self.agent.get(&req.path).call(),
            HttpMethod::Delete => self.agent.delete(&req.path).call(),
            HttpMethod::Post | HttpMethod::Put => {
                let mut builder = if req.method == HttpMethod::Post {
                    self.agent.post(&req.path)
                } else {
                    self.agent.put(&req.path)
                };
                for (name, value) in &req.headers {
                    builder = builder.header(name, value);
                }
                builder.send(body.as_bytes())
            }
        };
        let mut response = result.map_err(|e| ApiError::transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::transport(e.to_string()))?;
        Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body,
        })
    }
}

/// Start the mock server on a random port and return its API base url.
fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}{}", mock_server::API_ROOT)
}

fn session(config: ClientConfig) -> Session<UreqTransport> {
    Session::new(
        WorkfrontClient::new(config, Credentials::api_key("integration-key")),
        UreqTransport::new(),
    )
}

fn task(i: usize) -> Item {
    let status = if i % 2 == 0 { "NEW" } else { "CUR" };
    json!({ "name": format!("task {i}"), "status": status })
        .as_object()
        .unwrap()
        .clone()
}

fn ids(rows: &[Value]) -> Vec<String> {
    rows.iter()
        .map(|row| row["ID"].as_str().unwrap().to_string())
        .collect()
}

fn status(value: &str) -> ParameterMap {
    ParameterMap::new().with("status", value).unwrap()
}

#[test]
fn workfront_lifecycle() {
    let base = start_server();
    let mut s = session(ClientConfig::new(&base).with_max_page_size(40));

    // Step 1: bulk create past the per-request ceiling.
    let items: Vec<Item> = (0..250).map(task).collect();
    let created = s.bulk_create("task", &items, &["name", "status"]).unwrap();
    assert_eq!(created.len(), 250);
    for (i, row) in created.iter().enumerate() {
        assert_eq!(row["name"], format!("task {i}"));
    }

    // Step 2: counts, with and without a filter.
    assert_eq!(s.count("task", &ParameterMap::new()).unwrap(), 250);
    assert_eq!(s.count("task", &status("NEW")).unwrap(), 125);

    // Step 3: paged search over everything, in creation order.
    let all = s.search(&SearchRequest::new("task").all()).unwrap();
    assert_eq!(all.len(), 250);
    assert_eq!(ids(&all), ids(&created));

    // Step 4: limited, filtered search.
    let limited = s
        .search(&SearchRequest::new("task").params(status("CUR")).limit(45))
        .unwrap();
    assert_eq!(limited.len(), 45);
    assert!(limited.iter().all(|row| row["status"] == "CUR"));

    // Step 5: unpaged search returns the server's default page.
    let plain = s.search(&SearchRequest::new("task")).unwrap();
    assert_eq!(plain.len(), mock_server::DEFAULT_LIMIT);

    // Step 6: bulk update.
    let updates: Vec<Item> = limited[..10]
        .iter()
        .map(|row| json!({ "ID": row["ID"], "status": "CPL" }).as_object().unwrap().clone())
        .collect();
    let updated = s.bulk_update("task", &updates, &["status"]).unwrap();
    assert_eq!(updated.len(), 10);
    assert_eq!(s.count("task", &status("CPL")).unwrap(), 10);

    // Step 7: fetch several by id.
    let wanted = ids(&created[..3]);
    let listed = s.get_list("task", &wanted, &["name"]).unwrap();
    assert_eq!(ids(&listed), wanted);

    // Step 8: record round-trip.
    let mut record = Record::fetch(&mut s, "task", &wanted[0], &["name"]).unwrap();
    record.set("name", "renamed");
    record.save(&mut s).unwrap();
    assert_eq!(s.get("task", &wanted[0], &[]).unwrap()["name"], "renamed");

    let mut fresh = Record::new("task");
    fresh.set("name", "fresh");
    fresh.save(&mut s).unwrap();
    assert!(fresh.id().is_some());

    // Step 9: a missing object.
    let err = s.get("task", "does-not-exist", &[]).unwrap_err();
    assert!(matches!(err, ApiError::NotFound));

    // Step 10: act on behalf of a user, then fall back to the API key.
    let total = s
        .as_user("ann@example.com", |s| {
            assert!(s.client().credentials().session_id.is_some());
            s.count("task", &ParameterMap::new())
        })
        .unwrap();
    assert_eq!(total, 251);
    assert_eq!(s.client().credentials().session_id, None);

    // Step 11: bulk delete everything, in chunks.
    let every = s.search(&SearchRequest::new("task").all()).unwrap();
    let results = s.bulk_delete("task", &ids(&every), true, true).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(s.count("task", &ParameterMap::new()).unwrap(), 0);
}

#[test]
fn server_rejects_chunks_above_its_ceiling() {
    let base = start_server();
    let mut s = session(ClientConfig::new(&base).with_max_bulk_size(150));
    let items: Vec<Item> = (0..120).map(task).collect();
    let err = s.bulk_create("task", &items, &[]).unwrap_err();
    assert!(matches!(err, ApiError::HttpError { status: 422, .. }));
    assert_eq!(s.count("task", &ParameterMap::new()).unwrap(), 0);
}

#[test]
fn login_and_logout_with_a_password() {
    let base = start_server();
    let client = WorkfrontClient::new(ClientConfig::new(&base), Credentials::default());
    let mut s = Session::new(client, UreqTransport::new());

    assert!(matches!(
        s.count("task", &ParameterMap::new()),
        Err(ApiError::MissingCredentials)
    ));
    let login = s.login("ann@example.com", Some("secret")).unwrap();
    assert_eq!(login.user_id.as_deref(), Some("ann@example.com"));
    assert_eq!(s.count("task", &ParameterMap::new()).unwrap(), 0);
    s.logout().unwrap();
    assert!(matches!(
        s.count("task", &ParameterMap::new()),
        Err(ApiError::MissingCredentials)
    ));
}
