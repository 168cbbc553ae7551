use std::process::{Command, Output};

fn runtime(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dynamics_runtime"))
        .args(args)
        .env("RUST_LOG", "info")
        .output()
        .expect("failed to spawn dynamics_runtime")
}

#[test]
fn default_demo_runs_to_completion() {
    let output = runtime(&["--frames", "90", "--prewarm", "0.2"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("starting playback"), "{stdout}");
    assert!(stdout.contains("playback finished"), "{stdout}");
}

#[test]
fn recipe_file_and_overrides_are_accepted() {
    let recipe = concat!(env!("CARGO_MANIFEST_DIR"), "/../recipe/tests/data/ponytail.json");
    let output = runtime(&[
        "--recipe",
        recipe,
        "--frames",
        "30",
        "--backend",
        "parallel-jobs",
        "--update",
        "fixed-cadence",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("FixedCadence"), "{stdout}");
    assert!(stdout.contains("playback finished"), "{stdout}");
}

#[test]
fn unknown_backend_is_rejected() {
    let output = runtime(&["--backend", "quantum"]);
    assert!(!output.status.success());
}

#[test]
fn missing_recipe_fails() {
    let output = runtime(&["--recipe", "no/such/recipe.json", "--frames", "1"]);
    assert!(!output.status.success());
}
