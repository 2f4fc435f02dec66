// ABOUTME: End-to-end sync cycle tests against a scripted in-memory transport
// ABOUTME: Covers batch ordering, failure handling, reconciliation deletes and import output

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use localization_sync::commands::run::{export_target, import_target, Stages};
use localization_sync::config::Config;
use localization_sync::orchestrator::{wait_while, MIN_POLL_INTERVAL};
use localization_sync::remote::{BatchRequest, Method, RemoteApi, Transport, TransportResponse};
use localization_sync::upload::UploadSettings;
use localization_sync::{
    SourceEntry, SyncError, SyncOrchestrator, SyncPhase, SyncResult, SyncSettings,
};

/// Transport that answers from a script and records every request.
#[derive(Default)]
struct ScriptedTransport {
    requests: Mutex<Vec<BatchRequest>>,
    /// Responses for upload POSTs, in order. Once empty, every record is acknowledged.
    upload_responses: Mutex<VecDeque<SyncResult<TransportResponse>>>,
    export_csv: Mutex<String>,
    records_json: Mutex<String>,
    /// Per-batch delete latency, indexed by batch order.
    delete_delays_ms: Vec<u64>,
    delete_completions: Mutex<Vec<usize>>,
    uploads_in_flight: AtomicUsize,
    max_uploads_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    fn with_export_csv(csv: &str) -> Self {
        let transport = Self::default();
        *transport.export_csv.lock().unwrap() = csv.to_string();
        transport
    }

    fn push_upload_response(&self, response: SyncResult<TransportResponse>) {
        self.upload_responses.lock().unwrap().push_back(response);
    }

    fn requests_with(&self, method: Method) -> Vec<BatchRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    fn acknowledge_all(body: &str) -> TransportResponse {
        let records: Vec<serde_json::Value> = serde_json::from_str(body).unwrap();
        let acks: Vec<serde_json::Value> = records
            .iter()
            .map(|r| serde_json::json!({ "id": r["id"] }))
            .collect();
        TransportResponse::new(201, serde_json::to_string(&acks).unwrap())
    }

    fn batch_index(body: &str) -> usize {
        let parsed: serde_json::Value = serde_json::from_str(body).unwrap();
        let first = parsed["ids"][0].as_str().unwrap();
        // Numbered `orphanN` ids come from the out-of-order test; anything else is batch 0.
        first
            .trim_start_matches("orphan")
            .parse::<usize>()
            .map_or(0, |n| n / 1000)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: BatchRequest) -> SyncResult<TransportResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let body = request.body.clone().unwrap_or_default();

        match request.method {
            Method::Post => {
                let in_flight = self.uploads_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_uploads_in_flight
                    .fetch_max(in_flight, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                self.uploads_in_flight.fetch_sub(1, Ordering::SeqCst);

                let scripted = self.upload_responses.lock().unwrap().pop_front();
                scripted.unwrap_or_else(|| Ok(Self::acknowledge_all(&body)))
            }
            Method::Get if request.url.ends_with("/export") => Ok(TransportResponse::new(
                200,
                self.export_csv.lock().unwrap().clone(),
            )),
            Method::Get => Ok(TransportResponse::new(
                200,
                self.records_json.lock().unwrap().clone(),
            )),
            Method::Delete => {
                let index = Self::batch_index(&body);
                if let Some(delay) = self.delete_delays_ms.get(index) {
                    tokio::time::sleep(Duration::from_millis(*delay)).await;
                }
                self.delete_completions.lock().unwrap().push(index);
                Ok(TransportResponse::new(200, ""))
            }
        }
    }
}

fn api() -> RemoteApi {
    RemoteApi::new(Some("https://remote.test/v1"), "export-view", "export-key", "import-key")
}

fn settings(record_sync: bool, combined: bool) -> SyncSettings {
    SyncSettings {
        record_sync,
        upload: UploadSettings {
            combined_namespace_ids: combined,
            ..UploadSettings::default()
        },
    }
}

fn entries(count: usize) -> Vec<SourceEntry> {
    (0..count)
        .map(|i| SourceEntry::new("ui", format!("key{i}"), format!("text {i}")))
        .collect()
}

fn uploaded_ids(request: &BatchRequest) -> Vec<String> {
    let records: Vec<serde_json::Value> =
        serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
    records
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect()
}

fn deleted_ids(transport: &ScriptedTransport) -> Vec<String> {
    transport
        .requests_with(Method::Delete)
        .iter()
        .flat_map(|r| {
            let body: serde_json::Value =
                serde_json::from_str(r.body.as_deref().unwrap()).unwrap();
            body["ids"]
                .as_array()
                .unwrap()
                .iter()
                .map(|id| id.as_str().unwrap().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

#[tokio::test]
async fn test_upload_2500_entries_in_three_sequential_batches() {
    let transport = Arc::new(ScriptedTransport::default());
    let orchestrator = SyncOrchestrator::new(Arc::clone(&transport), api(), settings(false, false));

    let report = orchestrator.export(&entries(2500)).await.unwrap();

    let posts = transport.requests_with(Method::Post);
    let sizes: Vec<usize> = posts.iter().map(|r| uploaded_ids(r).len()).collect();
    assert_eq!(sizes, vec![1000, 1000, 500]);
    assert_eq!(uploaded_ids(&posts[0])[0], "key0");
    assert_eq!(uploaded_ids(&posts[1])[0], "key1000");
    assert_eq!(uploaded_ids(&posts[2])[0], "key2000");
    assert_eq!(transport.max_uploads_in_flight.load(Ordering::SeqCst), 1);

    assert_eq!(report.entries_updated(), 2500);
    assert_eq!(report.upload.batches, 3);
    assert_eq!(orchestrator.session().phase(), SyncPhase::Idle);
    assert!(transport.requests_with(Method::Get).is_empty());
    assert!(transport.requests_with(Method::Delete).is_empty());
}

#[tokio::test]
async fn test_entries_updated_is_sum_of_acknowledgements() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.push_upload_response(Ok(TransportResponse::new(200, r#"[{},{}]"#)));
    transport.push_upload_response(Ok(TransportResponse::new(200, "[]")));
    transport.push_upload_response(Ok(TransportResponse::new(201, r#"[{},{},{},{},{}]"#)));

    let orchestrator = SyncOrchestrator::new(Arc::clone(&transport), api(), settings(false, false));
    let report = orchestrator.export(&entries(2500)).await.unwrap();

    assert_eq!(report.entries_updated(), 7);
    assert_eq!(orchestrator.session().counters().entries_updated, 7);
}

#[tokio::test]
async fn test_upload_failure_abandons_remaining_batches() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.push_upload_response(Ok(TransportResponse::new(200, "[{}]")));
    transport.push_upload_response(Ok(TransportResponse::new(500, "boom")));

    let orchestrator = SyncOrchestrator::new(Arc::clone(&transport), api(), settings(true, false));
    let err = orchestrator.export(&entries(2500)).await.unwrap_err();

    assert!(matches!(err, SyncError::HttpError { status: 500, .. }));
    assert_eq!(transport.requests_with(Method::Post).len(), 2);
    assert!(transport.requests_with(Method::Get).is_empty());
    assert_eq!(orchestrator.session().phase(), SyncPhase::Idle);
    assert_eq!(orchestrator.session().counters().entries_updated, 1);
}

#[tokio::test]
async fn test_malformed_acknowledgement_aborts_upload() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.push_upload_response(Ok(TransportResponse::new(200, "not json")));

    let orchestrator = SyncOrchestrator::new(Arc::clone(&transport), api(), settings(false, false));
    let err = orchestrator.export(&entries(1500)).await.unwrap_err();

    assert!(matches!(err, SyncError::ParseFailure(_)));
    assert_eq!(transport.requests_with(Method::Post).len(), 1);
}

#[tokio::test]
async fn test_full_cycle_deletes_remote_orphans() {
    let csv = "Record ID,Path,src_enUS\n\
               \"ui,start\",ui,Start\n\
               \"ui,old\",ui,Old\n\
               \"blueprints/hud,ammo\",blueprints/hud,Ammo\n\
               \"menu,title\",menu,Title\n\
               \"ui,quit\",ui,Quit\n";
    let transport = Arc::new(ScriptedTransport::with_export_csv(csv));
    let local = vec![
        SourceEntry::new("ui", "start", "Start"),
        SourceEntry::new("ui", "quit", "Quit"),
        SourceEntry::new("ui", "local_only", "Only here"),
    ];

    let orchestrator = SyncOrchestrator::new(Arc::clone(&transport), api(), settings(true, true));
    let report = orchestrator.export(&local).await.unwrap();

    assert_eq!(
        uploaded_ids(&transport.requests_with(Method::Post)[0]),
        vec!["ui,start", "ui,quit", "ui,local_only"]
    );
    let export_fetch = &transport.requests_with(Method::Get)[0];
    assert_eq!(export_fetch.header_value("Authorization"), Some("ApiKey export-key"));

    let deletes = transport.requests_with(Method::Delete);
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].header_value("Authorization"), Some("ApiKey import-key"));
    assert_eq!(deleted_ids(&transport), vec!["ui,old", ",ammo", "menu,title"]);

    assert_eq!(report.deletion_candidates, 3);
    assert_eq!(report.entries_deleted(), 3);
    assert_eq!(orchestrator.session().phase(), SyncPhase::Idle);
}

#[tokio::test]
async fn test_lowercase_header_row_is_never_deleted() {
    let csv = "record id,path,src_enUS\n\
               \"ui,start\",ui,Start\n\
               \"ui,quit\",ui,Quit\n";
    let transport = Arc::new(ScriptedTransport::with_export_csv(csv));
    let local = vec![
        SourceEntry::new("ui", "start", "Start"),
        SourceEntry::new("ui", "quit", "Quit"),
    ];

    let orchestrator = SyncOrchestrator::new(Arc::clone(&transport), api(), settings(true, true));
    let report = orchestrator.export(&local).await.unwrap();

    assert_eq!(report.deletion_candidates, 0);
    assert!(transport.requests_with(Method::Delete).is_empty());
}

#[tokio::test]
async fn test_case_only_differences_are_not_deleted() {
    let csv = "Record ID,Path\n\
               \"UI,Start\",UI\n\
               \"Blueprints/bp,k2\",Blueprints/bp\n";
    let transport = Arc::new(ScriptedTransport::with_export_csv(csv));
    let local = vec![SourceEntry::new("ui", "start", "Start")];

    let orchestrator = SyncOrchestrator::new(Arc::clone(&transport), api(), settings(true, true));
    orchestrator.export(&local).await.unwrap();

    assert_eq!(deleted_ids(&transport), vec![",k2"]);
}

#[tokio::test]
async fn test_missing_path_column_aborts_without_deletes() {
    let transport = Arc::new(ScriptedTransport::with_export_csv(
        "Record ID,src_enUS\nold,Old\n",
    ));
    let orchestrator = SyncOrchestrator::new(Arc::clone(&transport), api(), settings(true, false));

    let err = orchestrator.export(&entries(1)).await.unwrap_err();

    assert!(matches!(err, SyncError::MissingColumn { column: "Path" }));
    assert!(transport.requests_with(Method::Delete).is_empty());
    assert_eq!(orchestrator.session().phase(), SyncPhase::Idle);
}

#[tokio::test]
async fn test_no_orphans_skips_delete_phase() {
    let transport = Arc::new(ScriptedTransport::with_export_csv(
        "Record ID,Path\nkey0,ui\n",
    ));
    let orchestrator = SyncOrchestrator::new(Arc::clone(&transport), api(), settings(true, false));

    let report = orchestrator.export(&entries(1)).await.unwrap();

    assert_eq!(report.deletion_candidates, 0);
    assert!(transport.requests_with(Method::Delete).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_delete_accounting_with_out_of_order_completions() {
    let mut csv = String::from("Record ID,Path\n");
    for i in 0..3500 {
        csv.push_str(&format!("orphan{i},gone\n"));
    }
    let transport = Arc::new(ScriptedTransport {
        delete_delays_ms: vec![40, 10, 30, 20],
        ..ScriptedTransport::with_export_csv(&csv)
    });
    let orchestrator = Arc::new(SyncOrchestrator::new(
        Arc::clone(&transport),
        api(),
        settings(true, false),
    ));

    let handle = orchestrator.start_export(Vec::new()).unwrap();
    let session = Arc::clone(orchestrator.session());
    wait_while(
        || {
            let counters = session.counters();
            assert!(counters.completed_batches <= counters.total_batches);
            if session.phase() == SyncPhase::Deleting
                && counters.completed_batches < counters.total_batches
            {
                assert!(orchestrator.has_delete_requests_pending());
            }
            orchestrator.has_requests_pending() || orchestrator.has_delete_requests_pending()
        },
        MIN_POLL_INTERVAL,
    )
    .await;

    let report = handle.await.unwrap().unwrap();
    assert_eq!(*transport.delete_completions.lock().unwrap(), vec![1, 3, 2, 0]);
    assert_eq!(report.delete.batches, 4);
    assert_eq!(report.entries_deleted(), 3500);

    let counters = session.counters();
    assert_eq!(counters.total_batches, 4);
    assert_eq!(counters.completed_batches, 4);
    assert!(!orchestrator.has_delete_requests_pending());
}

#[tokio::test]
async fn test_second_export_while_running_is_rejected() {
    let transport = Arc::new(ScriptedTransport::default());
    let orchestrator = Arc::new(SyncOrchestrator::new(
        Arc::clone(&transport),
        api(),
        settings(false, false),
    ));

    let handle = orchestrator.start_export(entries(10)).unwrap();
    assert!(orchestrator.has_requests_pending());

    let err = orchestrator.export(&entries(1)).await.unwrap_err();
    assert!(matches!(err, SyncError::SessionBusy(SyncPhase::Exporting)));

    let report = handle.await.unwrap().unwrap();
    assert_eq!(report.entries_updated(), 10);
    assert!(!orchestrator.has_requests_pending());
}

fn write_config(dir: &std::path::Path, sync_records: bool) -> Config {
    let toml = format!(
        r#"
        [remote]
        api_base_url = "https://remote.test/v1"
        export_api_key = "export-key"
        export_view_id = "export-view"
        import_api_key = "import-key"
        import_view_ids = ["import-a"]

        [sync]
        sync_records = {sync_records}
        use_combined_namespace_id = true

        [[targets]]
        name = "Game"
        entries = "game.csv"
        cultures = ["en-US", "fr-FR", "de-DE"]

        [sections.CI]
        export = true
        import = true
        source_changes = true
        output_dir = "out"
        "#
    );
    let path = dir.join("sync.toml");
    std::fs::write(&path, toml).unwrap();
    std::fs::write(
        dir.join("game.csv"),
        "Namespace,Key,NativeText,fr-FR\nui,start,Start,Commencer\nui,quit,Quit,\n",
    )
    .unwrap();
    Config::load(&path).unwrap()
}

#[tokio::test]
async fn test_export_target_from_config_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), false);
    let transport = Arc::new(ScriptedTransport::default());

    let report = export_target(&config, &config.targets[0], Arc::clone(&transport))
        .await
        .unwrap();

    assert_eq!(report.entries_updated(), 2);
    let posts = transport.requests_with(Method::Post);
    assert_eq!(posts[0].url, "https://remote.test/v1/views/export-view/records");
    assert_eq!(uploaded_ids(&posts[0]), vec!["ui,start", "ui,quit"]);
}

const IMPORT_RECORDS: &str = r#"[
    {"id": "ui,start", "path": "ui", "cells": [
        {"columnId": "src_enUS", "value": "Start \"now\""},
        {"columnId": "tg_frFR", "value": "Commencer"}
    ]},
    {"id": "hud menu,ammo", "path": "hud", "cells": [
        {"columnId": "src_enUS", "value": "Ammo"},
        {"columnId": "tg_deDE", "value": "Munition"}
    ]},
    {"id": "../../escape,key", "path": "x", "cells": [{"columnId": "src_enUS", "value": "Out"}]},
    {"id": "ui,blank", "path": "ui", "cells": []}
]"#;

fn read_key_values(path: &std::path::Path) -> Vec<(String, String)> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|row| {
            let row = row.unwrap();
            (row[0].to_string(), row[1].to_string())
        })
        .collect()
}

#[tokio::test]
async fn test_import_target_writes_translations_and_source_changes() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), false);
    let transport = ScriptedTransport::default();
    *transport.records_json.lock().unwrap() = IMPORT_RECORDS.to_string();

    let output_dir = config.sections["CI"].output_dir.clone();
    let stages = Stages {
        export: false,
        import: true,
        source_changes: true,
    };
    let report = import_target(&config, &config.targets[0], &output_dir, stages, &transport)
        .await
        .unwrap();

    let game_dir = dir.path().join("out").join("Game");
    assert_eq!(
        report.translation_files,
        vec![
            game_dir.join("fr-FR").join("Game.po"),
            game_dir.join("de-DE").join("Game.po")
        ]
    );
    let french = std::fs::read_to_string(game_dir.join("fr-FR").join("Game.po")).unwrap();
    assert!(french.contains("\"Language: fr-FR\\n\""));
    assert!(french.contains(
        "msgctxt \"ui,start\"\nmsgid \"Start \\\"now\\\"\"\nmsgstr \"Commencer\"\n"
    ));
    assert!(french.contains("msgctxt \"hudmenu,ammo\"\nmsgid \"Ammo\"\nmsgstr \"\"\n"));
    let german = std::fs::read_to_string(game_dir.join("de-DE").join("Game.po")).unwrap();
    assert!(german.contains("msgid \"Ammo\"\nmsgstr \"Munition\"\n"));

    assert_eq!(
        report.source_change_files,
        vec![
            game_dir.join(".._.._escape.csv"),
            game_dir.join("hudmenu.csv"),
            game_dir.join("ui.csv")
        ]
    );
    assert_eq!(
        read_key_values(&game_dir.join("ui.csv")),
        vec![("start".to_string(), "Start \"now\"".to_string())]
    );
    assert!(!dir.path().join("escape.csv").exists());

    // One fetch serves both stages.
    let fetches = transport.requests_with(Method::Get);
    assert_eq!(fetches.len(), 1);
    assert_eq!(fetches[0].url, "https://remote.test/v1/views/import-a/records");
    assert_eq!(fetches[0].header_value("Authorization"), Some("ApiKey import-key"));
}

#[tokio::test]
async fn test_import_target_runs_only_requested_stages() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), false);
    let transport = ScriptedTransport::default();
    *transport.records_json.lock().unwrap() = IMPORT_RECORDS.to_string();

    let output_dir = config.sections["CI"].output_dir.clone();
    let stages = Stages {
        export: false,
        import: false,
        source_changes: true,
    };
    let report = import_target(&config, &config.targets[0], &output_dir, stages, &transport)
        .await
        .unwrap();

    assert!(report.translation_files.is_empty());
    assert_eq!(report.source_change_files.len(), 3);
    assert!(!dir.path().join("out").join("Game").join("fr-FR").exists());
}
