use executor_core::mocks::{NoopProvider, ScriptedProvider};
use executor_core::{ExecutorRegistry, FeaturesInfo, Phase};

/// Register stand-in backends so the binary can exercise the full dispatch path.
/// Aborts on a duplicate name.
pub fn register_demo_executors(registry: &ExecutorRegistry) {
    let shell = FeaturesInfo {
        variables: true,
        artifacts: true,
        upload_multiple_artifacts: true,
        cache: true,
        shared: true,
        session: true,
        terminal: true,
        ..Default::default()
    };
    registry.register_or_abort("shell", NoopProvider::with_features(shell));
    registry.register_or_abort("docker", NoopProvider::with_features(FeaturesInfo::all()));
    registry.register_or_abort("fail-prepare", ScriptedProvider::failing_at(Phase::Prepare));
    registry.register_or_abort("fail-start", ScriptedProvider::failing_at(Phase::Start));
    registry.register_or_abort("unavailable", ScriptedProvider::unavailable());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_demo_executor() {
        let registry = ExecutorRegistry::new();
        register_demo_executors(&registry);
        assert_eq!(
            registry.list_names(),
            vec!["docker", "fail-prepare", "fail-start", "shell", "unavailable"]
        );
        assert!(!registry.available().contains(&"unavailable".to_string()));
    }
}
