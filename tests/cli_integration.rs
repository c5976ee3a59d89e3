//! Integration tests for the command-line interface
//!
//! Drives the built binary against a scratch Next.js-style workspace

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const COMPONENTS: &str = "src/components/tasks/components";

const TASK_ITEM: &str = r#""use client"

import { Checkbox } from "@/components/ui/checkbox"
import type { Task } from "@/lib/types"

interface TaskItemProps {
  task: Task
  onToggle: (id: string) => void
}

export function TaskItem({
  task,
  onToggle,
}: TaskItemProps) {
  return (
    <div className="flex items-center gap-2">
      <Checkbox checked={task.done} onCheckedChange={() => onToggle(task.id)} />
      <span>{task.title}</span>
    </div>
  )
}
"#;

const SORTABLE_TASK_ITEM: &str = r#""use client"

import { useSortable } from "@dnd-kit/sortable"
import { CSS } from "@dnd-kit/utilities"
import { TaskItem } from "./task-item"

export function SortableTaskItem({ task, onToggle }: SortableTaskItemProps) {
  const { attributes, listeners, setNodeRef, transform } = useSortable({ id: task.id })
  const style = { transform: CSS.Transform.toString(transform) }

  return (
    <div ref={setNodeRef} style={style} {...attributes} {...listeners}>
      <TaskItem task={task} onToggle={onToggle} />
    </div>
  )
}
"#;

/// Helper to create a test workspace holding the task list components
fn setup_test_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let components = dir.path().join(COMPONENTS);
    fs::create_dir_all(&components).unwrap();

    fs::write(components.join("task-item.tsx"), TASK_ITEM).unwrap();
    fs::write(components.join("sortable-task-item.tsx"), SORTABLE_TASK_ITEM).unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{ "name": "tasks", "version": "0.3.1", "private": true }"#,
    )
    .unwrap();

    dir
}

fn source_patcher(workspace: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_source-patcher"))
        .args(args)
        .arg("--workspace")
        .arg(workspace)
        .env_remove("SOURCE_PATCHER_WORKSPACE")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn read(workspace: &Path, name: &str) -> String {
    fs::read_to_string(workspace.join(COMPONENTS).join(name)).unwrap()
}

#[test]
fn test_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_source-patcher"))
        .arg("--help")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = stdout(&output);
    for command in ["apply", "run", "status", "list"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
}

#[test]
fn test_memoize_task_item() {
    let workspace = setup_test_workspace();

    let output = source_patcher(workspace.path(), &["run", "memoize-task-item"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "TaskItem modified.\n");

    let patched = read(workspace.path(), "task-item.tsx");
    assert!(patched.starts_with(
        "\"use client\"\n\nimport React from 'react'\nimport { Checkbox } from \"@/components/ui/checkbox\"\n"
    ));
    assert!(patched.contains(
        "export const TaskItem = React.memo(function TaskItem({\n  task,\n  onToggle,\n}: TaskItemProps) {\n"
    ));
    assert!(patched.ends_with("    </div>\n  )\n})\n"));
}

#[test]
fn test_memoize_twice_reports_already_memoized() {
    let workspace = setup_test_workspace();

    let _ = source_patcher(workspace.path(), &["run", "memoize-task-item"]);
    let first = read(workspace.path(), "task-item.tsx");

    let output = source_patcher(workspace.path(), &["run", "memoize-task-item"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Already memoized\n");
    assert_eq!(read(workspace.path(), "task-item.tsx"), first);
}

#[test]
fn test_memoize_sortable_task_item() {
    let workspace = setup_test_workspace();

    let output = source_patcher(workspace.path(), &["run", "memoize-sortable-task-item"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "SortableTaskItem modified.\n");

    let patched = read(workspace.path(), "sortable-task-item.tsx");
    assert!(patched.starts_with("\"use client\"\n\nimport React from 'react'\n"));
    assert!(patched.contains(
        "export const SortableTaskItem = React.memo(function SortableTaskItem({ task, onToggle }: SortableTaskItemProps) {\n"
    ));
    assert!(patched.ends_with("    </div>\n  )\n})\n"));
}

#[test]
fn test_check_task_item_never_writes() {
    let workspace = setup_test_workspace();

    let output = source_patcher(workspace.path(), &["run", "check-task-item"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Not memoized, modifying...\nDone\n");
    assert_eq!(read(workspace.path(), "task-item.tsx"), TASK_ITEM);

    let _ = source_patcher(workspace.path(), &["run", "memoize-task-item"]);
    let output = source_patcher(workspace.path(), &["run", "check-task-item"]);
    assert_eq!(stdout(&output), "Already memoized\n");
}

#[test]
fn test_check_task_item_without_marker_is_not_already_memoized() {
    let workspace = setup_test_workspace();
    // Memoized through a bare `memo`, so `React.memo` never appears
    let bare_memo = "import React from 'react'\nexport const TaskItem = memo(function TaskItem() {\n  return <div />\n})\n";
    fs::write(workspace.path().join(COMPONENTS).join("task-item.tsx"), bare_memo).unwrap();

    let output = source_patcher(workspace.path(), &["run", "check-task-item"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Not memoized, modifying...\nDone\n");
    assert_eq!(read(workspace.path(), "task-item.tsx"), bare_memo);
}

#[test]
fn test_check_task_item_accepts_named_memo_import() {
    let workspace = setup_test_workspace();
    let named = TASK_ITEM.replacen(
        "import { Checkbox }",
        "import { memo } from 'react'\nimport { Checkbox }",
        1,
    );
    fs::write(workspace.path().join(COMPONENTS).join("task-item.tsx"), &named).unwrap();

    let output = source_patcher(workspace.path(), &["run", "check-task-item", "--diff"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.starts_with("Not memoized, modifying...\nDone\n"));
    assert!(stdout.contains("+export const TaskItem = React.memo(function TaskItem({"));
    assert!(!stdout.contains("+import React from 'react'"));
    assert_eq!(read(workspace.path(), "task-item.tsx"), named);
}

#[test]
fn test_fix_use_client_hoists_directive() {
    let workspace = setup_test_workspace();
    let misplaced = SORTABLE_TASK_ITEM.replacen(
        "\"use client\"\n\n",
        "import React from 'react'\n\"use client\"\n\n",
        1,
    );
    fs::write(
        workspace.path().join(COMPONENTS).join("sortable-task-item.tsx"),
        &misplaced,
    )
    .unwrap();

    let output = source_patcher(workspace.path(), &["run", "fix-use-client"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        format!("Fixed {COMPONENTS}/sortable-task-item.tsx\n")
    );
    assert!(read(workspace.path(), "sortable-task-item.tsx")
        .starts_with("\"use client\"\n\nimport React from 'react'\n\nimport { useSortable }"));

    // Already at the top: silent no-op
    let output = source_patcher(workspace.path(), &["run", "fix-use-client"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "");
}

#[test]
fn test_run_pattern_not_found_is_not_fatal() {
    let workspace = setup_test_workspace();
    let renamed = TASK_ITEM.replace("export function TaskItem(", "export function TaskRow(");
    fs::write(workspace.path().join(COMPONENTS).join("task-item.tsx"), &renamed).unwrap();

    let output = source_patcher(workspace.path(), &["run", "memoize-task-item"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Pattern not found"));
    assert_eq!(read(workspace.path(), "task-item.tsx"), renamed);
}

#[test]
fn test_run_missing_file_fails() {
    let workspace = setup_test_workspace();
    fs::remove_file(workspace.path().join(COMPONENTS).join("task-item.tsx")).unwrap();

    let output = source_patcher(workspace.path(), &["run", "memoize-task-item"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("file not found"));
}

#[test]
fn test_unknown_preset() {
    let workspace = setup_test_workspace();

    let output = source_patcher(workspace.path(), &["run", "memoize-everything"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown preset"));
}

const MEMO_JOBS: &str = r#"[meta]
name = "memo"
version_range = ">=0.3.0"
workspace_relative = true

[[jobs]]
id = "memo-task-item"
file = "src/components/tasks/components/task-item.tsx"

[[jobs.rules]]
type = "marker-check"
pattern = "memo("

[[jobs.rules]]
type = "wrap-region"
start = "export function TaskItem({"
prefix = "export const TaskItem = memo(function TaskItem({"
suffix = ")"

[[jobs.rules]]
type = "ensure-import"
line = "import { memo } from 'react'"
"#;

fn write_patches(workspace: &Path, name: &str, content: &str) {
    let patches = workspace.join("patches");
    fs::create_dir_all(&patches).unwrap();
    fs::write(patches.join(name), content).unwrap();
}

#[test]
fn test_apply_and_status() {
    let workspace = setup_test_workspace();
    write_patches(workspace.path(), "memo.toml", MEMO_JOBS);

    let output = source_patcher(workspace.path(), &["status"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("NOT APPLIED"));

    let output = source_patcher(workspace.path(), &["apply"]);
    assert!(output.status.success(), "{}", stdout(&output));
    let out = stdout(&output);
    assert!(out.contains("Version: 0.3.1"));
    assert!(out.contains("memo-task-item: Applied 2 rule(s)"));
    assert!(read(workspace.path(), "task-item.tsx")
        .contains("export const TaskItem = memo(function TaskItem({"));

    let output = source_patcher(workspace.path(), &["apply"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("memo-task-item: Already patched"));

    let output = source_patcher(workspace.path(), &["status"]);
    let out = stdout(&output);
    assert!(out.contains("APPLIED"));
    assert!(!out.contains("NOT APPLIED"));
}

#[test]
fn test_apply_dry_run_with_diff() {
    let workspace = setup_test_workspace();
    write_patches(workspace.path(), "memo.toml", MEMO_JOBS);

    let output = source_patcher(workspace.path(), &["apply", "--dry-run", "--diff"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("DRY RUN"));
    assert!(out.contains("memo-task-item: Would apply"));
    assert!(out.contains("+import { memo } from 'react'"));
    assert!(out.contains("-export function TaskItem({"));
    assert_eq!(read(workspace.path(), "task-item.tsx"), TASK_ITEM);
}

#[test]
fn test_apply_version_range_skip() {
    let workspace = setup_test_workspace();
    write_patches(
        workspace.path(),
        "memo.toml",
        &MEMO_JOBS.replace(">=0.3.0", ">=1.0.0"),
    );

    let output = source_patcher(workspace.path(), &["apply"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("memo-task-item: Skipped"));
    assert_eq!(read(workspace.path(), "task-item.tsx"), TASK_ITEM);
}

#[test]
fn test_apply_exits_nonzero_when_pattern_missing() {
    let workspace = setup_test_workspace();
    write_patches(
        workspace.path(),
        "memo.toml",
        &MEMO_JOBS.replace("export function TaskItem({", "export function TaskRow({"),
    );

    let output = source_patcher(workspace.path(), &["apply"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Pattern not found"));
    assert_eq!(read(workspace.path(), "task-item.tsx"), TASK_ITEM);
}

#[test]
fn test_apply_without_job_files_fails() {
    let workspace = setup_test_workspace();

    let output = Command::new(env!("CARGO_BIN_EXE_source-patcher"))
        .args(["apply", "--workspace"])
        .arg(workspace.path())
        .current_dir(workspace.path())
        .env_remove("SOURCE_PATCHER_WORKSPACE")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No .toml job files found"));
}

#[test]
fn test_list_shows_presets_and_job_files() {
    let workspace = setup_test_workspace();
    write_patches(workspace.path(), "memo.toml", MEMO_JOBS);

    let output = source_patcher(workspace.path(), &["list"]);
    assert!(output.status.success());
    let out = stdout(&output);
    for preset in [
        "fix-use-client",
        "memoize-sortable-task-item",
        "memoize-task-item",
        "check-task-item",
    ] {
        assert!(out.contains(preset), "list is missing {preset}");
    }
    assert!(out.contains("memo.toml (1 jobs, version >=0.3.0)"));
}

#[test]
fn test_missing_workspace() {
    let output = Command::new(env!("CARGO_BIN_EXE_source-patcher"))
        .args(["status", "--workspace", "/nonexistent/workspace/path"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
