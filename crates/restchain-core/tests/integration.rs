//! End-to-end chain execution against an in-memory transport

use std::collections::HashMap;
use std::sync::Mutex;

use restchain_core::{
    BasicCredential, CancelToken, Chain, ChainBuilder, ExecMode, ExecOptions, ExtractError,
    FailurePolicy, FieldValue, HttpResponse, JoinSpec, Record, Transport,
};

/// Canned URL→body responses with a recorded call log.
struct MockTransport {
    responses: HashMap<String, Result<String, u16>>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    fn new(responses: &[(&str, Result<&str, u16>)]) -> Self {
        Self {
            responses: responses
                .iter()
                .map(|&(url, body)| (url.to_string(), body.map(str::to_string)))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        _credential: Option<&BasicCredential>,
    ) -> Result<HttpResponse, ExtractError> {
        let full = if params.is_empty() {
            url.to_string()
        } else {
            let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("{url}?{}", query.join("&"))
        };
        self.calls.lock().unwrap().push(full.clone());
        match self.responses.get(&full) {
            Some(Ok(body)) => Ok(HttpResponse {
                status: 200,
                body: body.clone().into_bytes(),
            }),
            Some(Err(status)) => Err(ExtractError::Transport {
                status: Some(*status),
                message: "canned failure".to_string(),
            }),
            None => Err(ExtractError::Transport {
                status: Some(404),
                message: format!("no canned response for {full}"),
            }),
        }
    }
}

const SPACES_BODY: &str = r#"{"_embedded":{"spaces":[
    {"token":"s1","name":"Sales","description":"desc1"},
    {"token":"s2","name":"Eng","description":"desc2"}
]}}"#;

const S1_REPORTS_BODY: &str = r#"{"_embedded":{"reports":[
    {"token":"r1","name":"Q1 Report","description":"d","created_at":"t0","updated_at":"t1"}
]}}"#;

const EMPTY_REPORTS_BODY: &str = r#"{"_embedded":{"reports":[]}}"#;

fn seed_acme() -> Vec<Record> {
    vec![Record::from_pairs([("org", "acme")]).unwrap()]
}

fn spaces_level() -> JoinSpec {
    JoinSpec::new(
        "https://x/{org}/spaces",
        "_embedded.spaces[*].[token,name,description]",
        &["group_id", "group", "group_desc"],
    )
    .unwrap()
}

fn reports_level() -> JoinSpec {
    JoinSpec::new(
        "https://x/{org}/spaces/{group_id}/reports",
        "_embedded.reports[*].[token,name,description,created_at,updated_at]",
        &[
            "report_id",
            "report_name",
            "report_desc",
            "report_created_at",
            "report_updated_at",
        ],
    )
    .unwrap()
}

/// The two-level spaces→reports chain over org "acme".
fn acme_chain() -> Chain {
    ChainBuilder::seed(seed_acme())
        .join(spaces_level())
        .join(reports_level())
        .build()
        .unwrap()
}

fn acme_transport() -> MockTransport {
    MockTransport::new(&[
        ("https://x/acme/spaces", Ok(SPACES_BODY)),
        ("https://x/acme/spaces/s1/reports", Ok(S1_REPORTS_BODY)),
        ("https://x/acme/spaces/s2/reports", Ok(EMPTY_REPORTS_BODY)),
    ])
}

fn collect(chain: &Chain, transport: &MockTransport, options: ExecOptions) -> Vec<Record> {
    chain
        .execute(transport, options)
        .map(|r| r.unwrap())
        .collect()
}

#[test]
fn two_level_join_merges_all_ancestor_fields() {
    let chain = acme_chain();
    let transport = acme_transport();
    let records = collect(&chain, &transport, ExecOptions::default());

    // s1 has one report, s2 has none: exactly one merged record.
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.get("org"), Some(&FieldValue::from("acme")));
    assert_eq!(record.get("group_id"), Some(&FieldValue::from("s1")));
    assert_eq!(record.get("group"), Some(&FieldValue::from("Sales")));
    assert_eq!(record.get("group_desc"), Some(&FieldValue::from("desc1")));
    assert_eq!(record.get("report_id"), Some(&FieldValue::from("r1")));
    assert_eq!(record.get("report_name"), Some(&FieldValue::from("Q1 Report")));
    assert_eq!(record.get("report_created_at"), Some(&FieldValue::from("t0")));
    assert_eq!(record.get("report_updated_at"), Some(&FieldValue::from("t1")));

    // The s2 call was still made (no skip policy), it just yielded nothing.
    assert_eq!(transport.call_count(), 3);
}

#[test]
fn single_level_one_tuple_per_parent_preserves_cardinality() {
    let seed = vec![
        Record::from_pairs([("org", "a")]).unwrap(),
        Record::from_pairs([("org", "b")]).unwrap(),
        Record::from_pairs([("org", "c")]).unwrap(),
    ];
    let chain = ChainBuilder::seed(seed.clone())
        .join(JoinSpec::new("https://x/{org}/spaces", "rows[*].[id]", &["id"]).unwrap())
        .build()
        .unwrap();
    let transport = MockTransport::new(&[
        ("https://x/a/spaces", Ok(r#"{"rows":[{"id":"1"}]}"#)),
        ("https://x/b/spaces", Ok(r#"{"rows":[{"id":"2"}]}"#)),
        ("https://x/c/spaces", Ok(r#"{"rows":[{"id":"3"}]}"#)),
    ]);

    let records = collect(&chain, &transport, ExecOptions::default());
    assert_eq!(records.len(), seed.len());
    for (record, parent) in records.iter().zip(&seed) {
        for name in parent.field_names() {
            assert_eq!(record.get(name), parent.get(name));
        }
    }
}

#[test]
fn templated_params_are_substituted_and_sent() {
    let chain = ChainBuilder::seed(seed_acme())
        .join(
            JoinSpec::new("https://x/spaces", "rows[*].[id]", &["id"])
                .unwrap()
                .param("filter", "all")
                .unwrap()
                .param("account", "{org}")
                .unwrap(),
        )
        .build()
        .unwrap();
    let transport = MockTransport::new(&[(
        "https://x/spaces?filter=all&account=acme",
        Ok(r#"{"rows":[{"id":"1"}]}"#),
    )]);

    let records = collect(&chain, &transport, ExecOptions::default());
    assert_eq!(records.len(), 1);
}

#[test]
fn output_is_deterministic_across_runs_and_modes() {
    let chain = acme_chain();
    let transport = acme_transport();

    let first = collect(&chain, &transport, ExecOptions::default());
    let second = collect(&chain, &transport, ExecOptions::default());
    let concurrent = collect(
        &chain,
        &transport,
        ExecOptions {
            mode: ExecMode::Concurrent { workers: 4 },
            ..ExecOptions::default()
        },
    );

    assert_eq!(first, second);
    assert_eq!(first, concurrent);

    // Byte-identical when serialized.
    let a: Vec<String> = first.iter().map(|r| r.to_json().to_string()).collect();
    let b: Vec<String> = second.iter().map(|r| r.to_json().to_string()).collect();
    assert_eq!(a, b);
}

#[test]
fn restart_reissues_every_call() {
    let chain = acme_chain();
    let transport = acme_transport();
    collect(&chain, &transport, ExecOptions::default());
    collect(&chain, &transport, ExecOptions::default());
    assert_eq!(transport.call_count(), 6);
}

#[test]
fn skip_policy_suppresses_child_call_for_sparse_parent() {
    // The s2 space has a null token: its reports call must not happen.
    let spaces = r#"{"_embedded":{"spaces":[
        {"token":"s1","name":"Sales","description":"desc1"},
        {"token":null,"name":"Eng","description":"desc2"}
    ]}}"#;
    let chain = ChainBuilder::seed(seed_acme())
        .join(spaces_level())
        .join(reports_level().skip_if_absent(&["group_id"]))
        .build()
        .unwrap();
    let transport = MockTransport::new(&[
        ("https://x/acme/spaces", Ok(spaces)),
        ("https://x/acme/spaces/s1/reports", Ok(S1_REPORTS_BODY)),
    ]);

    let records = collect(&chain, &transport, ExecOptions::default());
    assert_eq!(records.len(), 1);
    assert_eq!(transport.call_count(), 2);
    assert!(!transport.calls().iter().any(|c| c.contains("null")));
}

#[test]
fn transport_failure_aborts_by_default() {
    let chain = acme_chain();
    let transport = MockTransport::new(&[
        ("https://x/acme/spaces", Ok(SPACES_BODY)),
        ("https://x/acme/spaces/s1/reports", Err(500)),
        ("https://x/acme/spaces/s2/reports", Ok(EMPTY_REPORTS_BODY)),
    ]);

    let results: Vec<_> = chain.execute(&transport, ExecOptions::default()).collect();
    assert_eq!(results.len(), 1);
    assert!(matches!(
        results[0],
        Err(ExtractError::Transport {
            status: Some(500),
            ..
        })
    ));
    // s2 was never attempted.
    assert_eq!(transport.call_count(), 2);
}

#[test]
fn skip_and_warn_policy_continues_past_failures() {
    let chain = ChainBuilder::seed(seed_acme())
        .join(spaces_level())
        .join(reports_level())
        .failure_policy(FailurePolicy::SkipAndWarn)
        .build()
        .unwrap();
    let transport = MockTransport::new(&[
        ("https://x/acme/spaces", Ok(SPACES_BODY)),
        ("https://x/acme/spaces/s1/reports", Err(500)),
        ("https://x/acme/spaces/s2/reports", Ok(S1_REPORTS_BODY)),
    ]);

    let records = collect(&chain, &transport, ExecOptions::default());
    // s1 failed and was skipped; s2's report still came through.
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("group_id"), Some(&FieldValue::from("s2")));
    assert_eq!(transport.call_count(), 3);
}

#[test]
fn cancellation_yields_emitted_records_then_cancelled() {
    let chain = acme_chain();
    let transport = acme_transport();
    let cancel = CancelToken::new();
    let mut stream = chain.execute(
        &transport,
        ExecOptions {
            cancel: cancel.clone(),
            ..ExecOptions::default()
        },
    );

    let first = stream.next().unwrap().unwrap();
    assert_eq!(first.get("report_id"), Some(&FieldValue::from("r1")));
    let calls_at_cancel = transport.call_count();

    cancel.cancel();
    assert!(matches!(stream.next(), Some(Err(ExtractError::Cancelled))));
    assert!(stream.next().is_none());
    // No further HTTP calls after cancellation.
    assert_eq!(transport.call_count(), calls_at_cancel);
}

#[test]
fn cancellation_before_start_makes_no_calls() {
    let chain = acme_chain();
    let transport = acme_transport();
    let cancel = CancelToken::new();
    cancel.cancel();

    let results: Vec<_> = chain
        .execute(
            &transport,
            ExecOptions {
                cancel,
                ..ExecOptions::default()
            },
        )
        .collect();
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(ExtractError::Cancelled)));
    assert_eq!(transport.call_count(), 0);
}

#[test]
fn concurrent_mode_issues_all_calls_but_keeps_parent_order() {
    let seed: Vec<Record> = ["a", "b", "c", "d"]
        .iter()
        .map(|org| Record::from_pairs([("org", *org)]).unwrap())
        .collect();
    let chain = ChainBuilder::seed(seed)
        .join(JoinSpec::new("https://x/{org}", "rows[*].[id]", &["id"]).unwrap())
        .build()
        .unwrap();
    let transport = MockTransport::new(&[
        ("https://x/a", Ok(r#"{"rows":[{"id":"1"},{"id":"2"}]}"#)),
        ("https://x/b", Ok(r#"{"rows":[]}"#)),
        ("https://x/c", Ok(r#"{"rows":[{"id":"3"}]}"#)),
        ("https://x/d", Ok(r#"{"rows":[{"id":"4"}]}"#)),
    ]);

    let records = collect(
        &chain,
        &transport,
        ExecOptions {
            mode: ExecMode::Concurrent { workers: 2 },
            ..ExecOptions::default()
        },
    );
    let ids: Vec<&FieldValue> = records.iter().map(|r| r.get("id").unwrap()).collect();
    assert_eq!(
        ids,
        vec![
            &FieldValue::from("1"),
            &FieldValue::from("2"),
            &FieldValue::from("3"),
            &FieldValue::from("4")
        ]
    );
    assert_eq!(transport.call_count(), 4);
}
