use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let config = r#"
[project]
definitions_dir = "Definitions"
generated_dir = "Generated"

[defaults]
namespace = "Game.Enums"

[generation]
use_powers_of_two_for_unflagged = false
"#;
    let config_path = dir.join("enum-sync.toml");
    fs::write(&config_path, config).unwrap();
    config_path
}

fn run(config_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_enum-sync"))
        .arg("-c")
        .arg(config_path)
        .args(args)
        .output()
        .expect("Failed to run enum-sync")
}

#[test]
fn test_new_sync_generate() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(temp.path());
    let generated = temp.path().join("Generated/Stage.cs");

    let output = run(&config_path, &["new", "Stage"]);
    assert!(output.status.success(), "new failed: {:?}", output);
    assert!(generated.exists(), "Enum file not created");
    assert!(temp.path().join("Definitions/Stage.json").exists());

    // Refuses to overwrite
    assert!(!run(&config_path, &["new", "Stage"]).status.success());

    // Hand edit: retire Value2, add Boss with a tooltip
    let edited = r#"namespace Game.Enums
{
    public enum Stage
    {
        None = 0,
        Value1 = 1,
        [System.Obsolete("Removed")]
        Value2 = 2,
        Value3 = 3,
        [UnityEngine.Tooltip("Final \"boss\" room")]
        Boss = 4,
    }
}
"#;
    fs::write(&generated, edited).unwrap();

    let output = run(&config_path, &["sync"]);
    assert!(output.status.success(), "sync failed: {:?}", output);

    let definition = fs::read_to_string(temp.path().join("Definitions/Stage.json")).unwrap();
    assert!(definition.contains("\"Boss\""));
    assert!(definition.contains("Final \\\"boss\\\" room"));

    let output = run(&config_path, &["generate", "--force"]);
    assert!(output.status.success(), "generate failed: {:?}", output);

    let text = fs::read_to_string(&generated).unwrap();
    assert!(text.starts_with("// <auto-generated>"));
    assert!(text.contains("        Value3 = 3,\n"));
    assert!(text.contains("        [UnityEngine.Tooltip(\"Final \\\"boss\\\" room\")]\n        Boss = 4,\n"));
    assert!(text.contains("        [System.Obsolete(\"Removed\")]\n        Value2 = 2,\n"));
}

#[test]
fn test_value_commands() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(temp.path());
    let generated = temp.path().join("Generated/Weapon.cs");

    assert!(run(&config_path, &["new", "Weapon"]).status.success());
    assert!(run(&config_path, &["add", "Weapon", "Sword", "--tooltip", "Sharp"]).status.success());
    assert!(run(&config_path, &["remove", "Weapon", "Value1"]).status.success());

    let text = fs::read_to_string(&generated).unwrap();
    assert!(text.contains("        Sword = 4,\n"));
    assert!(text.contains("        [System.Obsolete(\"Removed\")]\n        Value1 = 1,\n"));

    assert!(run(&config_path, &["restore", "Weapon", "Value1"]).status.success());
    assert!(run(&config_path, &["rename", "Weapon", "Value3", "Bow"]).status.success());
    let text = fs::read_to_string(&generated).unwrap();
    assert!(text.contains("        Value1 = 1,\n"));
    assert!(text.contains("        Bow = 3,\n"));
    assert!(!text.contains("Obsolete"));

    // Unknown values and invalid names fail
    assert!(!run(&config_path, &["remove", "Weapon", "Spear"]).status.success());
    assert!(!run(&config_path, &["add", "Weapon", "class"]).status.success());

    let output = run(&config_path, &["check"]);
    assert!(output.status.success(), "check failed: {:?}", output);
}

#[test]
fn test_check_reports_invalid_definitions() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(temp.path());
    fs::create_dir_all(temp.path().join("Definitions")).unwrap();
    fs::write(
        temp.path().join("Definitions/Bad.json"),
        r#"{"enum_name": "Bad", "values": ["A", "A"]}"#,
    )
    .unwrap();

    let output = run(&config_path, &["check"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("A: duplicate value"), "stderr: {}", stderr);

    // Invalid definitions are never generated
    assert!(!run(&config_path, &["generate", "Bad"]).status.success());
    assert!(!temp.path().join("Generated/Bad.cs").exists());
}

#[test]
fn test_detect_and_insert() {
    let temp = TempDir::new().unwrap();
    let config_path = write_config(temp.path());
    let scripts = temp.path().join("Scripts");
    fs::create_dir_all(&scripts).unwrap();
    let source = scripts.join("States.cs");
    fs::write(
        &source,
        r#"namespace Game.Ai
{
    public enum Mood
    {
        Calm = 0,
        Angry = 1,
    }

    [System.Flags]
    public enum Senses
    {
        Sight = 1,
        Hearing = 2,
    }
}
"#,
    )
    .unwrap();

    let output = run(&config_path, &["detect"]);
    assert!(output.status.success(), "detect failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Game.Ai.Mood  2 value(s)"), "stdout: {}", stdout);
    assert!(stdout.contains("Game.Ai.Senses [Flags]  2 value(s)"), "stdout: {}", stdout);
    assert!(stdout.contains("Found 2 enum(s)"));

    let file = source.to_str().unwrap();
    let output = run(&config_path, &["insert", file, "Senses", "smell sense", "--sanitize"]);
    assert!(output.status.success(), "insert failed: {:?}", output);
    let output = run(&config_path, &["insert", file, "Mood", "Sleepy"]);
    assert!(output.status.success(), "insert failed: {:?}", output);

    let text = fs::read_to_string(&source).unwrap();
    assert!(text.contains("        Hearing = 2,\n        smell_sense = 4,\n    }\n"));
    assert!(text.contains("        Angry = 1,\n        Sleepy = 2,\n    }\n"));
    assert!(!scripts.join("States.cs.backup").exists());

    // Duplicates and unknown enums leave the file alone
    assert!(!run(&config_path, &["insert", file, "Mood", "Calm"]).status.success());
    assert!(!run(&config_path, &["insert", file, "Weather", "Rain"]).status.success());
    assert_eq!(fs::read_to_string(&source).unwrap(), text);
}
