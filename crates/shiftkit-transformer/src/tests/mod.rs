//! Crate-level tests running real plugin scripts on the host.

#[cfg(unix)]
mod behaviour;

#[cfg(unix)]
mod host {
    use std::fs;

    use serde_json::json;
    use shiftkit_container::ContainerSupport;
    use shiftkit_environment::EnvironmentInfo;

    use crate::{Executable, ExecutableLoader, Transformer, TransformerConfig};

    #[test]
    fn host_plugin_runs_detect_then_transform() {
        let source = tempfile::tempdir().expect("source");
        let context = tempfile::tempdir().expect("context");
        let service = source.path().join("cart");
        fs::create_dir_all(&service).expect("service dir");
        fs::write(
            context.path().join("detect.sh"),
            "printf '{\"cart\": [{\"configs\": {\"Dir\": \"%s\"}}]}' \"$1\"\n",
        )
        .expect("detect script");
        fs::write(
            context.path().join("transform.sh"),
            "printf '{\"pathMappings\": [{\"type\": \"source\", \"srcPath\": \"%s\", \"destPath\": \"out\"}]}' \"$1\"\n",
        )
        .expect("transform script");

        let support = ContainerSupport::disabled();
        let loader = ExecutableLoader::new(&support);
        let plugin = Executable::init(
            TransformerConfig::new(
                "cart-detector",
                json!({
                    "platforms": [std::env::consts::OS],
                    "directoryDetectCMD": ["sh", "detect.sh"],
                    "transformCMD": ["sh", "transform.sh"]
                }),
            ),
            EnvironmentInfo::new("cart-detector", source.path(), context.path()),
            &loader,
        )
        .expect("init");

        let services = plugin.directory_detect(&service).expect("detect");
        let artifacts = services.get("cart").expect("cart service");
        let dir = service.display().to_string();
        assert_eq!(artifacts[0].service_dir(), Some(dir.as_str()));
        assert_eq!(artifacts[0].configs["Dir"], json!(dir));

        let output = plugin.transform(artifacts, &[]);
        assert_eq!(output.path_mappings.len(), 1);
        assert_eq!(output.path_mappings[0].src_path, dir);
        plugin.finish().expect("finish");
    }
}
