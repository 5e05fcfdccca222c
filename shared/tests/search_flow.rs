use crux_core::testing::AppTester;
use crux_http::protocol::{HttpResponse, HttpResult};
use shared::capabilities::{MapHandle, MapOperation};
use shared::{
    AddressSelection, ContainerId, Effect, Event, GeocodingError, GeoviewConfig, LngLat,
    LookupNotice, Model, SearchPhase, SuggestionId, SuggestionResult,
};

type Tester = AppTester<shared::App, Effect>;

fn setup() -> (Tester, Model, MapHandle) {
    let app = Tester::default();
    let mut model = Model::default();

    let config = GeoviewConfig::new("test-key")
        .unwrap()
        .with_geocoding_base("https://geo.example.com/geocoding")
        .unwrap();
    app.update(Event::Configure(config), &mut model);
    app.update(
        Event::Mount {
            container: ContainerId::new("map"),
        },
        &mut model,
    );
    let handle = model.map.handle().cloned().unwrap();
    (app, model, handle)
}

fn result(id: &str, name: &str, lng: f64, lat: f64) -> SuggestionResult {
    SuggestionResult {
        id: SuggestionId::new(id),
        display_name: name.to_string(),
        coordinates: LngLat::new(lng, lat).unwrap(),
        bounding_box: None,
        relevance: 1.0,
        raw_properties: serde_json::json!({}),
    }
}

fn http_urls(effects: &[Effect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Http(request) => Some(request.operation.url.clone()),
            _ => None,
        })
        .collect()
}

/// Answers the single pending HTTP request and feeds the resulting events back in.
fn respond(app: &Tester, model: &mut Model, effects: Vec<Effect>, response: HttpResponse) {
    let mut request = effects
        .into_iter()
        .find_map(|effect| match effect {
            Effect::Http(request) => Some(request),
            _ => None,
        })
        .expect("an http request was issued");

    let update = app
        .resolve(&mut request, HttpResult::Ok(response))
        .expect("http request resolves");
    for event in update.events {
        app.update(event, model);
    }
}

fn feature(id: &str, name: &str, coordinates: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "type": "Feature",
        "place_name": name,
        "relevance": 0.9,
        "properties": {},
        "geometry": { "type": "Point", "coordinates": coordinates }
    })
}

fn map_ops(effects: &[Effect]) -> Vec<MapOperation> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Map(request) => Some(request.operation.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_denver_search_and_select() {
    let (app, mut model, _) = setup();
    let center = model.viewport.center;

    let update = app.update(Event::AddressInputChanged("Denver".into()), &mut model);
    let urls = http_urls(&update.effects);
    assert_eq!(urls.len(), 1);
    assert!(urls[0].starts_with("https://geo.example.com/geocoding/Denver.json?"));
    assert!(urls[0].contains("autocomplete=true"));
    assert!(urls[0].contains(&format!("proximity={}%2C{}", center.lng(), center.lat())));
    assert!(urls[0].contains("key=test-key"));
    assert!(matches!(model.search.phase(), SearchPhase::Fetching(_)));

    let token = model.search.latest_token();
    app.update(
        Event::ForwardSearchCompleted {
            token,
            result: Ok(vec![
                result("place.1", "Denver, Colorado, United States", -104.9903, 39.7392),
                result("place.2", "Denver City, Texas, United States", -102.8291, 32.9645),
            ]),
        },
        &mut model,
    );
    assert_eq!(model.search.suggestions().len(), 2);
    assert_eq!(model.search.suggestions()[1].id.as_str(), "place.2");

    let update = app.update(Event::SuggestionSelected(0), &mut model);
    let flights: Vec<_> = map_ops(&update.effects)
        .into_iter()
        .filter(|op| matches!(op, MapOperation::FlyTo { .. }))
        .collect();
    assert_eq!(flights.len(), 1);
    let MapOperation::FlyTo { center, zoom, .. } = &flights[0] else {
        unreachable!()
    };
    assert_eq!(*center, LngLat::new(-104.9903, 39.7392).unwrap());
    assert_eq!(*zoom, 14.0);

    assert_eq!(model.viewport.center, LngLat::new(-104.9903, 39.7392).unwrap());
    assert!(model.search.suggestions().is_empty());
    assert_eq!(
        model.search.selection().display_text(),
        "Denver, Colorado, United States"
    );
}

#[test]
fn test_short_query_never_reaches_network() {
    let (app, mut model, _) = setup();

    for text in ["", "D", "De"] {
        let update = app.update(Event::AddressInputChanged(text.into()), &mut model);
        assert!(http_urls(&update.effects).is_empty());
        assert!(model.search.suggestions().is_empty());
        assert_eq!(model.search.phase(), SearchPhase::Editing);
    }
}

#[test]
fn test_stale_forward_response_discarded() {
    let (app, mut model, _) = setup();

    app.update(Event::AddressInputChanged("Gold".into()), &mut model);
    let old = model.search.latest_token();
    app.update(Event::AddressInputChanged("Golden".into()), &mut model);
    let new = model.search.latest_token();

    app.update(
        Event::ForwardSearchCompleted {
            token: new,
            result: Ok(vec![result("new", "Golden, Colorado", -105.22, 39.75)]),
        },
        &mut model,
    );
    let update = app.update(
        Event::ForwardSearchCompleted {
            token: old,
            result: Ok(vec![
                result("old.1", "Gold Hill", -105.4, 40.06),
                result("old.2", "Goldfield", -117.23, 37.7),
            ]),
        },
        &mut model,
    );

    assert!(update.effects.is_empty());
    assert_eq!(model.search.suggestions().len(), 1);
    assert_eq!(model.search.suggestions()[0].id.as_str(), "new");
}

#[test]
fn test_forward_failure_settles_empty() {
    let (app, mut model, _) = setup();

    app.update(Event::AddressInputChanged("Boulder".into()), &mut model);
    let token = model.search.latest_token();
    app.update(
        Event::ForwardSearchCompleted {
            token,
            result: Err(GeocodingError::Status(503)),
        },
        &mut model,
    );

    assert!(model.search.suggestions().is_empty());
    assert_eq!(model.search.phase(), SearchPhase::Suggesting);
    assert_eq!(model.search.selection().display_text(), "Boulder");
}

#[test]
fn test_click_resolves_address() {
    let (app, mut model, handle) = setup();

    let update = app.update(
        Event::MapClicked {
            handle,
            lng: -105.0,
            lat: 39.5,
        },
        &mut model,
    );
    let urls = http_urls(&update.effects);
    assert_eq!(urls.len(), 1);
    assert!(urls[0].contains("/geocoding/-105,39.5.json?key=test-key"));

    let token = model.search.latest_token();
    app.update(
        Event::ReverseLookupCompleted {
            token,
            result: Ok(vec![result("addr.1", "1 Main St, Littleton", -105.0, 39.5)]),
        },
        &mut model,
    );

    let resolved = model.search.selection().resolved().unwrap();
    assert_eq!(resolved.id.as_str(), "addr.1");
    assert_eq!(model.search.suggestions().len(), 1);
    assert_eq!(model.lookup_notice, None);
}

#[test]
fn test_click_on_repeated_world_is_wrapped() {
    let (app, mut model, handle) = setup();

    let update = app.update(
        Event::MapClicked {
            handle,
            lng: 255.0,
            lat: 39.5,
        },
        &mut model,
    );
    let urls = http_urls(&update.effects);
    assert!(urls[0].contains("/geocoding/-105,39.5.json"));
}

#[test]
fn test_click_with_no_address_leaves_state() {
    let (app, mut model, handle) = setup();

    app.update(Event::AddressInputChanged("Littleton".into()), &mut model);
    let token = model.search.latest_token();
    app.update(
        Event::ForwardSearchCompleted {
            token,
            result: Ok(vec![result("a", "Littleton, CO", -105.01, 39.61)]),
        },
        &mut model,
    );
    let selection = model.search.selection().clone();
    let suggestions = model.search.suggestions().to_vec();

    app.update(
        Event::MapClicked {
            handle,
            lng: -150.0,
            lat: -60.0,
        },
        &mut model,
    );
    let token = model.search.latest_token();
    app.update(
        Event::ReverseLookupCompleted {
            token,
            result: Ok(Vec::new()),
        },
        &mut model,
    );

    assert_eq!(model.search.selection(), &selection);
    assert_eq!(model.search.suggestions(), suggestions.as_slice());
    assert_eq!(model.lookup_notice, Some(LookupNotice::NotFound));
}

#[test]
fn test_reverse_failure_reported_as_notice() {
    let (app, mut model, handle) = setup();

    app.update(
        Event::MapClicked {
            handle,
            lng: -105.0,
            lat: 39.5,
        },
        &mut model,
    );
    let token = model.search.latest_token();
    app.update(
        Event::ReverseLookupCompleted {
            token,
            result: Err(GeocodingError::Transport("offline".into())),
        },
        &mut model,
    );

    assert_eq!(model.search.selection(), &AddressSelection::default());
    assert!(matches!(model.lookup_notice, Some(LookupNotice::Failed(_))));
}

#[test]
fn test_late_search_after_click_is_discarded() {
    let (app, mut model, handle) = setup();

    app.update(Event::AddressInputChanged("Englewood".into()), &mut model);
    let search_token = model.search.latest_token();

    app.update(
        Event::MapClicked {
            handle,
            lng: -105.0,
            lat: 39.5,
        },
        &mut model,
    );
    let click_token = model.search.latest_token();
    app.update(
        Event::ReverseLookupCompleted {
            token: click_token,
            result: Ok(vec![result("addr.1", "1 Main St", -105.0, 39.5)]),
        },
        &mut model,
    );
    app.update(
        Event::ForwardSearchCompleted {
            token: search_token,
            result: Ok(vec![
                result("e.1", "Englewood, CO", -104.98, 39.64),
                result("e.2", "Englewood, NJ", -73.97, 40.89),
            ]),
        },
        &mut model,
    );

    assert_eq!(model.search.selection().display_text(), "1 Main St");
    assert_eq!(model.search.suggestions().len(), 1);
}

#[test]
fn test_dismiss_hides_list_and_keeps_text() {
    let (app, mut model, _) = setup();

    app.update(Event::AddressInputChanged("Aurora".into()), &mut model);
    let token = model.search.latest_token();
    app.update(Event::SuggestionsDismissed, &mut model);
    app.update(
        Event::ForwardSearchCompleted {
            token,
            result: Ok(vec![result("a", "Aurora, CO", -104.83, 39.73)]),
        },
        &mut model,
    );

    assert!(model.search.suggestions().is_empty());
    assert_eq!(model.search.selection().display_text(), "Aurora");
}

#[test]
fn test_proximity_follows_reported_camera() {
    let (app, mut model, handle) = setup();
    let camera = serde_json::from_value(serde_json::json!({
        "center": [-104.99, 39.74],
        "zoom": 12.0,
        "pitch": 0.0,
        "bearing": 0.0
    }))
    .unwrap();

    app.update(Event::CameraMoved { handle, camera }, &mut model);
    let update = app.update(Event::AddressInputChanged("Union Station".into()), &mut model);

    let urls = http_urls(&update.effects);
    assert!(urls[0].contains("proximity=-104.99%2C39.74"));
}

#[test]
fn test_search_before_configuration_is_skipped() {
    let app = Tester::default();
    let mut model = Model::default();

    let update = app.update(Event::AddressInputChanged("Denver".into()), &mut model);
    assert!(http_urls(&update.effects).is_empty());
    assert_eq!(model.search.selection().display_text(), "Denver");
}

#[test]
fn test_service_answer_becomes_suggestions() {
    let (app, mut model, _) = setup();

    let update = app.update(Event::AddressInputChanged("Denver".into()), &mut model);
    let body = serde_json::json!({
        "type": "FeatureCollection",
        "features": [
            feature("place.1", "Denver, Colorado, United States", serde_json::json!([-104.9903, 39.7392])),
            feature("place.2", "Denver City, Texas, United States", serde_json::json!([-102.8291, 32.9645]))
        ]
    });
    respond(
        &app,
        &mut model,
        update.effects,
        HttpResponse::ok().json(body).build(),
    );

    let ids: Vec<&str> = model
        .search
        .suggestions()
        .iter()
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(ids, vec!["place.1", "place.2"]);
    assert_eq!(
        model.search.suggestions()[0].coordinates,
        LngLat::new(-104.9903, 39.7392).unwrap()
    );
    assert_eq!(model.search.phase(), SearchPhase::Suggesting);
}

#[test]
fn test_service_unavailable_settles_empty() {
    let (app, mut model, _) = setup();

    let update = app.update(Event::AddressInputChanged("Boulder".into()), &mut model);
    respond(
        &app,
        &mut model,
        update.effects,
        HttpResponse::status(503).body("Service Unavailable").build(),
    );

    assert!(model.search.suggestions().is_empty());
    assert_eq!(model.search.phase(), SearchPhase::Suggesting);
    assert_eq!(model.search.selection().display_text(), "Boulder");
}

#[test]
fn test_feature_with_altitude_kept_beside_broken_one() {
    let (app, mut model, _) = setup();

    let update = app.update(Event::AddressInputChanged("Denver".into()), &mut model);
    let body = serde_json::json!({
        "features": [
            feature("place.1", "Denver, Colorado", serde_json::json!([-104.9903, 39.7392])),
            feature("broken", "Nowhere", serde_json::json!("not a position")),
            feature("place.2", "Denver City, Texas", serde_json::json!([-102.8, 32.9, 1600.0]))
        ]
    });
    respond(
        &app,
        &mut model,
        update.effects,
        HttpResponse::ok().json(body).build(),
    );

    let ids: Vec<&str> = model
        .search
        .suggestions()
        .iter()
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(ids, vec!["place.1", "place.2"]);
}

#[test]
fn test_reverse_answer_without_features_is_not_found() {
    let (app, mut model, handle) = setup();

    let update = app.update(
        Event::MapClicked {
            handle,
            lng: -150.0,
            lat: -60.0,
        },
        &mut model,
    );
    respond(
        &app,
        &mut model,
        update.effects,
        HttpResponse::ok()
            .json(serde_json::json!({ "type": "FeatureCollection", "features": [] }))
            .build(),
    );

    assert_eq!(model.lookup_notice, Some(LookupNotice::NotFound));
    assert_eq!(model.search.selection(), &AddressSelection::default());
}
