// ABOUTME: Embedded dice engine backed by the in-process rule systems.
// ABOUTME: Systems are registered as factories and constructed once, on first use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, error};

use super::{adapt_help, DiceEngine, RollOutcome, NO_HELP};
use crate::catalog::GameSystemInfo;
use crate::roller::{FastRng, Rng};
use crate::system::{builtin_systems, GameSystem, Generic, SystemFactory, DEFAULT_SYSTEM};

/// Rule systems available to the embedded engine, by id.
#[derive(Clone, Default)]
pub struct SystemRegistry {
    factories: HashMap<String, SystemFactory>,
}

impl SystemRegistry {
    /// An empty registry. Lookups still fall back to the generic system.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every embedded system.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (id, factory) in builtin_systems() {
            registry.register(id, factory);
        }
        registry
    }

    pub fn register(&mut self, id: impl Into<String>, factory: SystemFactory) {
        self.factories.insert(id.into(), factory);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.factories.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn build(&self, id: &str) -> Option<Arc<dyn GameSystem>> {
        self.factories.get(id).map(|factory| factory())
    }
}

/// Constructs rule systems on demand and caches them for the process lifetime.
pub struct SystemLoader {
    registry: SystemRegistry,
    loaded: tokio::sync::Mutex<HashMap<String, Arc<dyn GameSystem>>>,
}

impl SystemLoader {
    pub fn new(registry: SystemRegistry) -> Self {
        Self {
            registry,
            loaded: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &SystemRegistry {
        &self.registry
    }

    /// The system for `id`, or the generic system when `id` is unknown.
    ///
    /// Concurrent first requests for one id wait on each other, so every
    /// factory runs at most once.
    pub async fn load(&self, id: &str) -> Arc<dyn GameSystem> {
        let id = if self.registry.contains(id) {
            id
        } else {
            DEFAULT_SYSTEM
        };

        let mut loaded = self.loaded.lock().await;
        if let Some(system) = loaded.get(id) {
            return Arc::clone(system);
        }

        let system = self
            .registry
            .build(id)
            .unwrap_or_else(|| Arc::new(Generic) as Arc<dyn GameSystem>);
        debug!(system = id, "loaded game system");
        loaded.insert(id.to_string(), Arc::clone(&system));
        system
    }
}

/// Evaluates commands in-process. Iterations are rolled one after another.
pub struct LocalEngine {
    loader: SystemLoader,
    rng: Mutex<Box<dyn Rng + Send>>,
}

impl LocalEngine {
    /// Every embedded system with an entropy-seeded RNG.
    pub fn new() -> Self {
        Self::with_rng(SystemRegistry::with_builtins(), FastRng::new())
    }

    /// Every embedded system with a reproducible RNG.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SystemRegistry::with_builtins(), FastRng::with_seed(seed))
    }

    pub fn with_rng(registry: SystemRegistry, rng: impl Rng + Send + 'static) -> Self {
        Self {
            loader: SystemLoader::new(registry),
            rng: Mutex::new(Box::new(rng)),
        }
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DiceEngine for LocalEngine {
    async fn evaluate(&self, command: &str, system_id: &str) -> RollOutcome {
        let system = self.loader.load(system_id).await;
        let result = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            system.eval(command, &mut **rng)
        };

        match result {
            Ok(Some(result)) => RollOutcome::from_eval(system.id(), result),
            Ok(None) => RollOutcome::empty(system.id()),
            Err(e) => {
                error!(system = system.id(), command, error = %e, "dice evaluation failed");
                RollOutcome::empty(system.id())
            }
        }
    }

    async fn accepts(&self, command: &str, system_id: &str) -> bool {
        self.loader
            .load(system_id)
            .await
            .command_pattern()
            .is_match(command)
    }

    async fn help_messages(&self, system_id: &str) -> Vec<String> {
        let generic = self.loader.load(DEFAULT_SYSTEM).await;
        let mut help = vec![adapt_help(generic.help_message())];
        if system_id.is_empty() || system_id == DEFAULT_SYSTEM {
            return help;
        }

        let system = self.loader.load(system_id).await;
        if system.id() != DEFAULT_SYSTEM && !system.help_message().is_empty() {
            help.push(adapt_help(system.help_message()));
        } else {
            help.push(NO_HELP.to_string());
        }
        help
    }

    async fn game_systems(&self) -> Vec<GameSystemInfo> {
        let mut infos = Vec::new();
        for id in self.loader.registry().ids() {
            let system = self.loader.load(&id).await;
            infos.push(GameSystemInfo {
                id: system.id().to_string(),
                name: system.name().to_string(),
                sort_key: system.sort_key().to_string(),
            });
        }
        infos
    }

    fn is_concurrent(&self) -> bool {
        false
    }

    fn label(&self) -> String {
        "System-Dice".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::future::join_all;
    use proptest::prelude::*;

    use super::*;
    use crate::roller::tests::TestRng;
    use crate::parser::MAX_OPERATORS;
    use crate::system::Cthulhu;

    fn engine(values: Vec<u32>) -> LocalEngine {
        LocalEngine::with_rng(SystemRegistry::with_builtins(), TestRng::new(values))
    }

    #[tokio::test]
    async fn test_loader_builds_each_system_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let mut registry = SystemRegistry::new();
        registry.register(
            "Cthulhu",
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Arc::new(Cthulhu) as Arc<dyn GameSystem>
            }),
        );
        let loader = SystemLoader::new(registry);

        let systems = join_all((0..8).map(|_| loader.load("Cthulhu"))).await;
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(systems.iter().all(|s| s.id() == "Cthulhu"));
    }

    #[tokio::test]
    async fn test_unknown_system_falls_back_to_generic() {
        let loader = SystemLoader::new(SystemRegistry::new());
        assert_eq!(loader.load("NoSuchSystem").await.id(), DEFAULT_SYSTEM);
    }

    #[tokio::test]
    async fn test_evaluate() {
        let outcome = engine(vec![3, 4]).evaluate("2d6+1", "DiceBot").await;
        assert_eq!(outcome.engine_id, "DiceBot");
        assert_eq!(outcome.text, "(2D6+1) ＞ 7[3,4]+1 ＞ 8");
        assert!(!outcome.is_empty_dice);
    }

    #[tokio::test]
    async fn test_evaluate_with_system() {
        let outcome = engine(vec![3]).evaluate("CC<=50", "Cthulhu").await;
        assert_eq!(outcome.engine_id, "Cthulhu");
        assert!(outcome.is_critical && outcome.is_success);
    }

    #[tokio::test]
    async fn test_evaluate_not_a_command() {
        let outcome = engine(vec![1]).evaluate("hello", "DiceBot").await;
        assert!(outcome.is_empty());
        assert!(outcome.is_empty_dice && outcome.is_failure);
    }

    #[tokio::test]
    async fn test_evaluation_error_degrades() {
        let outcome = engine(vec![1]).evaluate("1d6/0", "DiceBot").await;
        assert!(outcome.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_commands_degrade() {
        let engine = LocalEngine::with_seed(1);
        let commands = [
            format!("{}1", "-".repeat(5_000)),
            format!("{}1d6", "(".repeat(5_000)),
            format!("1d6{}", "+1".repeat(5_000)),
            "9".repeat(5_000),
            "1000d10000".repeat(3),
        ];
        for command in &commands {
            let outcome = engine.evaluate(command, "DiceBot").await;
            assert!(outcome.is_empty(), "{}", &command[..20]);
        }

        let widest = format!("{}>=1", vec!["1000B10000"; MAX_OPERATORS + 1].join("+"));
        let outcome = engine.evaluate(&widest, "DiceBot").await;
        assert!(outcome.text.ends_with("成功数129000"));
    }

    #[tokio::test]
    async fn test_accepts_uses_system_pattern() {
        let engine = engine(vec![1]);
        assert!(engine.accepts("CC<=50", "Cthulhu").await);
        assert!(!engine.accepts("CC<=50", "DiceBot").await);
        assert!(!engine.accepts("hello", "DiceBot").await);
    }

    #[tokio::test]
    async fn test_help_messages() {
        let engine = engine(vec![1]);
        assert_eq!(engine.help_messages("DiceBot").await.len(), 1);

        let help = engine.help_messages("Cthulhu").await;
        assert_eq!(help.len(), 2);
        assert!(help[1].contains("CC<=n"));

        let help = engine.help_messages("NoSuchSystem").await;
        assert_eq!(help[1], NO_HELP);
    }

    #[tokio::test]
    async fn test_game_systems() {
        let ids: Vec<String> = engine(vec![1])
            .game_systems()
            .await
            .into_iter()
            .map(|info| info.id)
            .collect();
        assert_eq!(ids, vec!["Cthulhu", "DiceBot", "DungeonsAndDragons5"]);
    }

    proptest! {
        #[test]
        fn evaluate_never_panics(command in "[-+*/()0-9dDbBkKhHlLcCsS<>=! ]{0,300}") {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            let engine = LocalEngine::with_seed(1);
            let outcome = runtime.block_on(engine.evaluate(&command, "DiceBot"));
            prop_assert_eq!(outcome.engine_id, "DiceBot");
        }
    }
}
