use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use stepweave::prelude::*;

/// Only lets the wrapped step run on the `main` branch.
#[derive(Debug)]
struct OnlyOnMain {
    inner: SharedStep,
}

#[async_trait]
impl Step for OnlyOnMain {
    async fn run(&self, config: PluginConfig, ctx: Context) -> StepResult {
        if ctx.get("branch") != Some(&json!("main")) {
            ctx.log(&format!("Skipping '{}' outside of main", self.inner.name()));
            return Ok(None);
        }
        self.inner.run(config, ctx).await
    }
}

fn registry() -> PluginRegistry {
    PluginRegistry::new()
        .register_plugin(
            "@release/npm",
            PluginModule::new("@release/npm")
                .with_step(
                    "verifyConditions",
                    step_fn("npm-verify", |_, _| async { Ok(Some(json!("npm token ok"))) }),
                )
                .with_step(
                    "publish",
                    step_fn("npm-publish", |config: PluginConfig, _| async move {
                        let tag = config.option("distTag").cloned().unwrap_or(json!("latest"));
                        Ok(Some(json!({ "published": "npm", "tag": tag })))
                    }),
                ),
        )
        .register_plugin(
            "@release/github",
            PluginModule::new("@release/github").with_step(
                "verifyConditions",
                step_fn("github-verify", |_, _| async { Ok(Some(json!("github token ok"))) }),
            ),
        )
        .register_step(
            "./scripts/release-notes",
            step_fn("release-notes", |_, _| async { Ok(Some(json!("## Notes"))) }),
        )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let weaver = Weaver::new(registry());
    let config = PluginConfig::from_value(json!({
        "monorepo": {
            "publish": [{ "path": "@release/npm", "distTag": "next" }],
            "generateNotes": "./scripts/release-notes",
        }
    }))?;
    let ctx = Context::new()
        .with_data("branch", json!("main"))
        .with_options(
            HostOptions::new()
                .with_plugin("@release/npm")
                .with_plugin("@release/github"),
        );

    let publish = weaver.wrap_multi_plugin(
        "monorepo",
        "publish",
        |inner| Arc::new(OnlyOnMain { inner }) as SharedStep,
        vec![],
    );
    let notes = weaver.append_multi_plugin(
        "monorepo",
        "generateNotes",
        step_fn("footer", |_, _| async { Ok(Some(json!("-- released by stepweave"))) }),
        vec![],
    );
    let verify = weaver.append_step(
        "verifyConditions",
        step_fn("verify-summary", |_, ctx: Context| async move {
            Ok(Some(json!({ "verified": ctx.step_results().len() })))
        }),
        None,
    );

    for (stage, steps) in [("verify", &verify), ("publish", &publish), ("notes", &notes)] {
        match steps.run_all(&config, &ctx).await {
            Ok(results) => {
                let produced: Vec<_> = results.into_iter().flatten().collect();
                println!("{stage}: {}", json!(produced));
            }
            Err(error) => println!("{stage} failed: {error}"),
        }
    }

    Ok(())
}
