use std::{sync::Arc, time::Duration};

use comanda_client::{
    storage::{MemoryStorage, SessionStorage},
    Client, Error,
};
use futures_util::future::join_all;
use http::StatusCode;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::support::{client, live_token, logged_in};

const CONCURRENT_CALLS: usize = 6;

fn tables_json() -> serde_json::Value {
    serde_json::json!([
        { "id": "t1", "numero": 1 },
        { "id": "t2", "numero": 2 },
    ])
}

async fn mount_tables(server: &MockServer, token: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/core/mesas/"))
        .and(header("Authorization", format!("Bearer {token}").as_str()))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_refresh(server: &MockServer, response: ResponseTemplate, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(response)
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[test_log::test(tokio::test)]
async fn attaches_the_current_access_token() {
    let server = MockServer::start().await;
    let token = live_token("a");
    mount_tables(
        &server,
        &token,
        ResponseTemplate::new(200).set_body_json(tables_json()),
    )
    .await;
    mount_refresh(&server, ResponseTemplate::new(500), 0).await;

    let client = client(
        &server,
        Arc::new(MemoryStorage::with_session(logged_in(&token, Some("r")))),
    );

    let tables = client.tables().list().await.unwrap();
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[1].number, 2);
}

#[test_log::test(tokio::test)]
async fn token_is_read_fresh_for_every_call() {
    let server = MockServer::start().await;
    let first = live_token("first");
    let second = live_token("second");
    mount_tables(
        &server,
        &first,
        ResponseTemplate::new(200).set_body_json(tables_json()),
    )
    .await;
    mount_tables(
        &server,
        &second,
        ResponseTemplate::new(200).set_body_json(serde_json::json!([])),
    )
    .await;

    let storage = Arc::new(MemoryStorage::with_session(logged_in(&first, Some("r"))));
    let client = client(&server, storage.clone());
    assert_eq!(client.tables().list().await.unwrap().len(), 2);

    storage.save(&logged_in(&second, Some("r"))).unwrap();
    assert!(client.tables().list().await.unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn concurrent_unauthorized_calls_share_one_refresh() {
    let server = MockServer::start().await;
    let stale = live_token("stale");
    let renewed = live_token("renewed");

    mount_tables(&server, &stale, ResponseTemplate::new(401)).await;
    mount_tables(
        &server,
        &renewed,
        ResponseTemplate::new(200).set_body_json(tables_json()),
    )
    .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({ "access": renewed }))
            .set_delay(Duration::from_millis(200)),
        1,
    )
    .await;

    let storage = Arc::new(MemoryStorage::with_session(logged_in(&stale, Some("r"))));
    let client = client(&server, storage.clone());

    let results = join_all((0..CONCURRENT_CALLS).map(|_| {
        let client = &client;
        async move { client.tables().list().await }
    }))
    .await;

    for result in results {
        assert_eq!(result.unwrap().len(), 2);
    }
    assert_eq!(storage.load().unwrap().access_token, Some(renewed));
}

#[test_log::test(tokio::test)]
async fn failed_refresh_rejects_every_call_and_clears_the_session() {
    let server = MockServer::start().await;
    let stale = live_token("stale");

    mount_tables(&server, &stale, ResponseTemplate::new(401)).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(401).set_delay(Duration::from_millis(200)),
        1,
    )
    .await;

    let storage = Arc::new(MemoryStorage::with_session(logged_in(&stale, Some("r"))));
    let client = client(&server, storage.clone());

    let results = join_all((0..CONCURRENT_CALLS).map(|_| {
        let client = &client;
        async move { client.tables().list().await }
    }))
    .await;

    for result in results {
        assert!(matches!(result, Err(Error::SessionExpired)));
    }
    assert!(storage.load().unwrap().is_empty());
    assert!(client.session().current_identity().is_none());
    assert!(!client.session().is_authenticated());
}

#[test_log::test(tokio::test)]
async fn missing_refresh_token_expires_the_session() {
    let server = MockServer::start().await;
    let stale = live_token("stale");

    mount_tables(&server, &stale, ResponseTemplate::new(401)).await;
    mount_refresh(&server, ResponseTemplate::new(200), 0).await;

    let storage = Arc::new(MemoryStorage::with_session(logged_in(&stale, None)));
    let client = client(&server, storage.clone());

    assert!(matches!(
        client.tables().list().await,
        Err(Error::SessionExpired)
    ));
    assert!(storage.load().unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn second_unauthorized_is_final() {
    let server = MockServer::start().await;
    let stale = live_token("stale");
    let renewed = live_token("renewed");

    mount_tables(&server, &stale, ResponseTemplate::new(401)).await;
    mount_tables(&server, &renewed, ResponseTemplate::new(401)).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access": renewed })),
        1,
    )
    .await;

    let storage = Arc::new(MemoryStorage::with_session(logged_in(&stale, Some("r"))));
    let client = client(&server, storage.clone());

    assert!(matches!(
        client.tables().list().await,
        Err(Error::Unauthorized(_))
    ));

    // The refreshed session is kept; only the call failed.
    assert_eq!(storage.load().unwrap().access_token, Some(renewed));
}

#[test_log::test(tokio::test)]
async fn other_errors_bypass_the_refresh() {
    let server = MockServer::start().await;
    let token = live_token("a");

    mount_tables(
        &server,
        &token,
        ResponseTemplate::new(403)
            .set_body_json(serde_json::json!({ "detail": "forbidden" })),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/core/pedidos/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_refresh(&server, ResponseTemplate::new(200), 0).await;

    let client = client(
        &server,
        Arc::new(MemoryStorage::with_session(logged_in(&token, Some("r")))),
    );

    match client.tables().list().await {
        Err(Error::Status { status, body }) => {
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert!(body.contains("forbidden"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(matches!(
        client.orders().list().await,
        Err(Error::Status { status, .. }) if status == StatusCode::INTERNAL_SERVER_ERROR
    ));
    assert!(client.session().is_authenticated());
}

#[test_log::test(tokio::test)]
async fn a_later_refresh_is_possible_after_one_settles() {
    let server = MockServer::start().await;
    let first = live_token("first");
    let second = live_token("second");
    let third = live_token("third");

    mount_tables(&server, &first, ResponseTemplate::new(401)).await;
    mount_tables(&server, &second, ResponseTemplate::new(401)).await;
    mount_tables(
        &server,
        &third,
        ResponseTemplate::new(200).set_body_json(tables_json()),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "access": third })),
        )
        .expect(2)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_session(logged_in(&first, Some("r"))));
    let client = client(&server, storage.clone());
    assert_eq!(client.tables().list().await.unwrap().len(), 2);

    // the backend revoked the token again
    storage.save(&logged_in(&second, Some("r"))).unwrap();
    assert_eq!(client.tables().list().await.unwrap().len(), 2);
}

async fn list_after(client: &Client, resource: &str, delay: Duration) -> Result<(), Error> {
    tokio::time::sleep(delay).await;
    match resource {
        "mesas" => client.tables().list().await.map(drop),
        "clientes" => client.customers().list().await.map(drop),
        "estados" => client.order_states().list().await.map(drop),
        "componentes" => client.components().list().await.map(drop),
        "pedidos" => client.orders().list().await.map(drop),
        other => unreachable!("no resource named {other}"),
    }
}

#[test_log::test(tokio::test)]
async fn queued_calls_are_replayed_in_arrival_order() {
    let server = MockServer::start().await;
    let stale = live_token("stale");
    let renewed = live_token("renewed");
    let renewed_bearer = format!("Bearer {renewed}");

    Mock::given(method("GET"))
        .and(header("Authorization", format!("Bearer {stale}").as_str()))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("Authorization", renewed_bearer.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({ "access": renewed }))
            .set_delay(Duration::from_millis(300)),
        1,
    )
    .await;

    let client = client(
        &server,
        Arc::new(MemoryStorage::with_session(logged_in(&stale, Some("r")))),
    );

    let arrival = ["mesas", "clientes", "estados", "componentes", "pedidos"];
    let results = join_all(arrival.iter().enumerate().map(|(position, resource)| {
        list_after(&client, resource, Duration::from_millis(20 * position as u64))
    }))
    .await;
    for result in results {
        result.unwrap();
    }

    let replayed: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| {
            request
                .headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                == Some(renewed_bearer.as_str())
        })
        .map(|request| request.url.path().to_string())
        .collect();

    let expected: Vec<String> = arrival
        .iter()
        .map(|resource| format!("/core/{resource}/"))
        .collect();
    assert_eq!(replayed, expected);
}
