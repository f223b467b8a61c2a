//! Plugin contract integration tests
//! Run with: cargo test --test plugin_contract_test

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use steambot_plugins::application::errors::{BotError, PluginError, PluginResult, StorageError};
use steambot_plugins::domain::entities::{
    BotAccount, BotStatus, CodeSubmitter, Command, Invocation, ResponseInfo, RunRejection, SteamId,
};
use steambot_plugins::domain::traits::Responder;
use steambot_plugins::infrastructure::config::{AccountConfig, Config, GuardMode};
use steambot_plugins::plugins::{self, Plugin, PluginState, SystemHandle};
use steambot_plugins::Host;

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

const OWNER: &str = "76561198260031749";
const STRANGER: &str = "76561197960287930";

fn id(raw: &str) -> SteamId {
    raw.parse().unwrap()
}

#[derive(Default)]
struct Collect(tokio::sync::Mutex<Vec<String>>);

impl Collect {
    async fn lines(&self) -> Vec<String> {
        self.0.lock().await.clone()
    }
}

#[async_trait]
impl Responder for Collect {
    async fn respond(&self, _res_info: &ResponseInfo, text: &str) -> Result<(), BotError> {
        self.0.lock().await.push(text.to_string());
        Ok(())
    }
}

type Journal = Arc<Mutex<Vec<String>>>;

/// Records every hook call
struct Recorder {
    sys: SystemHandle,
    journal: Journal,
    fail_load: bool,
    with_unload: bool,
}

impl Recorder {
    fn note(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl Plugin for Recorder {
    fn name(&self) -> &str {
        self.sys.plugin_name()
    }

    async fn load(&self) -> PluginResult<()> {
        self.note("load".to_string());
        self.sys.register_command(
            Command::new("record").with_handler(|inv: Invocation| async move {
                inv.respond("recorded").await
            }),
        );
        if self.fail_load {
            return Err(PluginError::Load("config missing".to_string()));
        }
        Ok(())
    }

    async fn ready(&self) -> PluginResult<()> {
        self.note("ready".to_string());
        Ok(())
    }

    async fn unload(&self) -> PluginResult<()> {
        self.note("unload".to_string());
        if self.with_unload {
            Ok(())
        } else {
            Err(PluginError::UnloadNotImplemented)
        }
    }

    async fn status_update(&self, bot: &BotAccount, old: BotStatus, new: BotStatus) {
        self.note(format!("status {} {}->{}", bot.index, old, new));
    }

    async fn steam_guard_input(&self, bot: &BotAccount, submitter: CodeSubmitter) {
        self.note(format!("guard {}", bot.index));
        submitter.submit("CODE1");
    }

    async fn steam_guard_qr_code(&self, bot: &BotAccount, challenge_url: &str) {
        self.note(format!("qr {} {}", bot.index, challenge_url.starts_with("https://s.team/q/")));
    }

    async fn data_update(&self, key: &str, old: Option<&serde_json::Value>, _new: &serde_json::Value) {
        self.note(format!("data {} old={}", key, old.is_some()));
    }
}

fn register_recorder(host: &Host, name: &str, journal: &Journal, fail_load: bool, with_unload: bool) {
    let journal = Arc::clone(journal);
    host.plugins
        .register_factory(name, move |sys| {
            Arc::new(Recorder {
                sys,
                journal: Arc::clone(&journal),
                fail_load,
                with_unload,
            }) as Arc<dyn Plugin>
        })
        .unwrap();
}

fn test_config(dir: &std::path::Path, enabled: &[&str], accounts: Vec<AccountConfig>) -> Config {
    let mut config = Config::default();
    config.bot.data_dir = dir.join("data");
    config.plugins.directory = dir.join("plugins");
    config.plugins.enabled = enabled.iter().map(|s| s.to_string()).collect();
    config.steam_guard.console_prompt = false;
    config.owners = vec![OWNER.to_string()];
    config.accounts = accounts;
    config
}

fn account(name: &str, guard: GuardMode) -> AccountConfig {
    AccountConfig {
        name: name.to_string(),
        guard,
    }
}

#[tokio::test]
async fn test_unload_after_load_without_ready() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let out = Arc::new(Collect::default());
    let host = Host::new(test_config(dir.path(), &["template"], vec![account("main", GuardMode::None)]), out);
    plugins::register_builtin(&host.plugins).unwrap();

    assert_eq!(host.start().await, 1);
    assert_eq!(host.plugins.state("template").await, Some(PluginState::Loaded));

    host.plugins.unload("template").await.unwrap();
    assert!(!host.plugins.has_plugin("template").await);
    assert!(!host.commands.command_names().contains(&"hello".to_string()));
}

#[tokio::test]
async fn test_full_startup_delivers_events_in_order() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let journal: Journal = Arc::default();
    let out = Arc::new(Collect::default());
    let config = test_config(
        dir.path(),
        &["recorder"],
        vec![account("main", GuardMode::None), account("alt", GuardMode::Code), account("qr", GuardMode::Qr)],
    );
    let host = Host::new(config, out);
    register_recorder(&host, "recorder", &journal, false, true);

    host.start().await;
    host.login_all(None).await.unwrap();
    host.ready().await;

    let entries = journal.lock().unwrap().clone();
    assert_eq!(
        entries,
        vec![
            "load",
            "data ownerid=true",
            "data ownerid=false",
            "status 0 OFFLINE->ONLINE",
            "guard 1",
            "status 1 OFFLINE->ONLINE",
            "qr 2 true",
            "status 2 OFFLINE->ONLINE",
            "ready",
        ]
    );
    assert_eq!(host.plugins.state("recorder").await, Some(PluginState::Ready));
    assert!(host.logger().is_ready());
}

#[tokio::test]
async fn test_template_skips_unanswered_guard_prompt() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let plugin_dir = dir.path().join("plugins").join("template");
    std::fs::create_dir_all(&plugin_dir).unwrap();
    std::fs::write(
        plugin_dir.join("config.json"),
        json!({ "guardTimeoutSecs": 0, "pingFirstOwner": false }).to_string(),
    )
    .unwrap();

    let out = Arc::new(Collect::default());
    let host = Host::new(test_config(dir.path(), &["template"], vec![account("main", GuardMode::Code)]), out);
    plugins::register_builtin(&host.plugins).unwrap();

    host.start().await;
    tokio::time::timeout(Duration::from_secs(5), host.login_all(None))
        .await
        .expect("template plugin should skip the account")
        .unwrap();

    let bot = host.accounts.get(0).await.unwrap();
    assert_eq!(bot.status, BotStatus::Skipped);
}

#[tokio::test]
async fn test_template_commands_and_ready_ping() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let plugin_dir = dir.path().join("plugins").join("template");
    std::fs::create_dir_all(&plugin_dir).unwrap();
    std::fs::write(plugin_dir.join("config.json"), json!({ "greeting": "Hi there" }).to_string()).unwrap();

    let out = Arc::new(Collect::default());
    let host = Host::new(test_config(dir.path(), &["template"], vec![account("main", GuardMode::None)]), out.clone());
    plugins::register_builtin(&host.plugins).unwrap();

    host.start().await;
    host.login_all(None).await.unwrap();
    host.ready().await;

    // ready ran ping as the first owner
    let lines = out.lines().await;
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Pong! 🏓 (") && lines[0].ends_with(" ms)"), "{}", lines[0]);

    let result = host
        .commands
        .run_command("cool-alias", vec![], out.clone(), host.response_info(Some(id(STRANGER))))
        .await;
    assert!(result.success);
    assert_eq!(out.lines().await.last().map(String::as_str), Some("Hi there"));

    let state = host
        .plugins
        .list_plugins()
        .await
        .into_iter()
        .find(|p| p.name == "template")
        .map(|p| p.state);
    assert_eq!(state, Some(PluginState::Ready));
    assert!(plugin_dir.join("lastload.txt").exists());
}

#[tokio::test]
async fn test_ping_refused_for_non_owner() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let out = Arc::new(Collect::default());
    let host = Host::new(test_config(dir.path(), &[], vec![account("main", GuardMode::None)]), out.clone());
    host.start().await;

    let result = host
        .commands
        .run_command("ping", vec![], out.clone(), host.response_info(Some(id(STRANGER))))
        .await;
    assert!(!result.success);
    assert_eq!(result.reason, Some(RunRejection::OwnersOnly));
    assert!(out.lines().await.is_empty());
}

#[tokio::test]
async fn test_failed_load_is_isolated() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let broken: Journal = Arc::default();
    let healthy: Journal = Arc::default();
    let out = Arc::new(Collect::default());
    let host = Host::new(
        test_config(dir.path(), &["broken", "healthy"], vec![account("main", GuardMode::None)]),
        out,
    );
    register_recorder(&host, "broken", &broken, true, true);
    register_recorder(&host, "healthy", &healthy, false, true);

    assert_eq!(host.start().await, 1);
    host.login_all(None).await.unwrap();
    host.ready().await;

    assert_eq!(host.plugins.state("broken").await, Some(PluginState::Failed));
    assert_eq!(broken.lock().unwrap().clone(), vec!["load"]);
    assert!(healthy.lock().unwrap().contains(&"ready".to_string()));
}

#[tokio::test]
async fn test_failed_load_drops_its_commands() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let journal: Journal = Arc::default();
    let out = Arc::new(Collect::default());
    let host = Host::new(test_config(dir.path(), &["broken"], vec![account("main", GuardMode::None)]), out.clone());
    register_recorder(&host, "broken", &journal, true, true);

    assert_eq!(host.start().await, 0);
    assert_eq!(host.plugins.state("broken").await, Some(PluginState::Failed));
    assert!(!host.commands.command_names().contains(&"record".to_string()));

    let result = host
        .commands
        .run_command("record", vec![], out.clone(), host.response_info(Some(id(OWNER))))
        .await;
    assert!(!result.success);
    assert_eq!(result.reason, Some(RunRejection::NotFound));
    assert!(out.lines().await.is_empty());
}

#[tokio::test]
async fn test_concurrent_loads_construct_once() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let journal: Journal = Arc::default();
    let out = Arc::new(Collect::default());
    let host = Host::new(test_config(dir.path(), &[], vec![account("main", GuardMode::None)]), out);
    register_recorder(&host, "recorder", &journal, false, true);

    let (a, b) = tokio::join!(host.plugins.load("recorder"), host.plugins.load("recorder"));
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert!(matches!(a.err().or(b.err()), Some(PluginError::AlreadyLoaded(_))));
    assert_eq!(journal.lock().unwrap().clone(), vec!["load"]);
    assert_eq!(host.plugins.list_plugins().await.len(), 1);
}

#[tokio::test]
async fn test_host_timeout_skips_unanswered_account() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let out = Arc::new(Collect::default());
    let mut config = test_config(dir.path(), &["silent"], vec![account("main", GuardMode::Code)]);
    config.steam_guard.timeout_secs = Some(0);
    let host = Host::new(config, out);

    // Receives the prompt and never answers it
    let seen: Arc<Mutex<Vec<CodeSubmitter>>> = Arc::default();
    let captured = Arc::clone(&seen);
    host.plugins
        .register_factory("silent", move |sys| {
            Arc::new(Silent {
                sys,
                seen: Arc::clone(&captured),
            }) as Arc<dyn Plugin>
        })
        .unwrap();

    host.start().await;
    tokio::time::timeout(Duration::from_secs(5), host.login_all(None))
        .await
        .expect("host timeout should skip the account")
        .unwrap();
    host.flush_events().await;

    assert_eq!(host.accounts.get(0).await.unwrap().status, BotStatus::Skipped);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

struct Silent {
    sys: SystemHandle,
    seen: Arc<Mutex<Vec<CodeSubmitter>>>,
}

#[async_trait]
impl Plugin for Silent {
    fn name(&self) -> &str {
        self.sys.plugin_name()
    }

    async fn steam_guard_input(&self, _bot: &BotAccount, submitter: CodeSubmitter) {
        self.seen.lock().unwrap().push(submitter);
    }
}

/// Changes a bot status from inside `load` and records what reaches it
struct EagerStatus {
    sys: SystemHandle,
    journal: Journal,
}

#[async_trait]
impl Plugin for EagerStatus {
    fn name(&self) -> &str {
        self.sys.plugin_name()
    }

    async fn load(&self) -> PluginResult<()> {
        self.sys
            .accounts
            .set_status(0, BotStatus::Online)
            .await
            .map_err(|e| PluginError::Load(e.to_string()))?;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        self.journal.lock().unwrap().push("load".to_string());
        Ok(())
    }

    async fn status_update(&self, bot: &BotAccount, old: BotStatus, new: BotStatus) {
        self.journal.lock().unwrap().push(format!("status {} {}->{}", bot.index, old, new));
    }
}

#[tokio::test]
async fn test_no_events_before_load_completes() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let journal: Journal = Arc::default();
    let out = Arc::new(Collect::default());
    let host = Host::new(test_config(dir.path(), &[], vec![account("main", GuardMode::None)]), out);

    let for_factory = Arc::clone(&journal);
    host.plugins
        .register_factory("eager", move |sys| {
            Arc::new(EagerStatus {
                sys,
                journal: Arc::clone(&for_factory),
            }) as Arc<dyn Plugin>
        })
        .unwrap();

    assert_eq!(host.plugins.load("eager").await.unwrap(), PluginState::Loaded);
    host.flush_events().await;
    host.accounts.set_status(0, BotStatus::Offline).await.unwrap();
    host.flush_events().await;

    assert_eq!(journal.lock().unwrap().clone(), vec!["load", "status 0 ONLINE->OFFLINE"]);
}

#[tokio::test]
async fn test_reload_replaces_commands() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let journal: Journal = Arc::default();
    let out = Arc::new(Collect::default());
    let host = Host::new(test_config(dir.path(), &["recorder"], vec![account("main", GuardMode::None)]), out.clone());
    register_recorder(&host, "recorder", &journal, false, false);

    host.start().await;
    host.login_all(None).await.unwrap();
    host.ready().await;

    // unload falls back to the default, which only warns
    assert_eq!(host.plugins.reload("recorder").await.unwrap(), PluginState::Ready);

    let entries = journal.lock().unwrap().clone();
    let tail: Vec<&str> = entries.iter().rev().take(3).rev().map(String::as_str).collect();
    assert_eq!(tail, vec!["unload", "load", "ready"]);

    let result = host
        .commands
        .run_command("record", vec![], out.clone(), host.response_info(Some(id(STRANGER))))
        .await;
    assert!(result.success);
    assert_eq!(out.lines().await, vec!["recorded"]);
}

#[tokio::test]
async fn test_duplicate_command_rejected_across_plugins() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let first: Journal = Arc::default();
    let second: Journal = Arc::default();
    let out = Arc::new(Collect::default());
    let host = Host::new(test_config(dir.path(), &["first", "second"], vec![account("main", GuardMode::None)]), out);
    register_recorder(&host, "first", &first, false, true);
    register_recorder(&host, "second", &second, false, true);

    host.start().await;
    assert!(!host.commands.register_command(Command::new("RECORD")));

    // the rejected registration from "second" must not remove the one from "first"
    host.plugins.unload("second").await.unwrap();
    assert!(host.commands.command_names().contains(&"record".to_string()));
}

#[tokio::test]
async fn test_handle_storage_round_trip() {
    ensure_init();
    let dir = tempfile::tempdir().unwrap();
    let journal: Journal = Arc::default();
    let out = Arc::new(Collect::default());
    let host = Host::new(test_config(dir.path(), &[], vec![account("main", GuardMode::None)]), out);

    let handle: Arc<Mutex<Option<SystemHandle>>> = Arc::default();
    let captured = Arc::clone(&handle);
    let journal_for_factory = Arc::clone(&journal);
    host.plugins
        .register_factory("storage", move |sys| {
            *captured.lock().unwrap() = Some(sys.clone());
            Arc::new(Recorder {
                sys,
                journal: Arc::clone(&journal_for_factory),
                fail_load: false,
                with_unload: true,
            }) as Arc<dyn Plugin>
        })
        .unwrap();
    host.plugins.load("storage").await.unwrap();

    let sys = handle.lock().unwrap().clone().unwrap();
    let blob = "ünïcødé\n\u{0}bytes".as_bytes();
    sys.write_plugin_data("blob", blob).await.unwrap();
    assert_eq!(sys.load_plugin_data("blob").await.unwrap(), blob);

    sys.delete_plugin_data("blob").await.unwrap();
    assert!(matches!(sys.load_plugin_data("blob").await, Err(StorageError::NotFound(_))));
}
