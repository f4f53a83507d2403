use assert_cmd::Command;
use predicates::prelude::*;
use prune_test::copy_fixture;

fn yarn_prune() -> Command {
  let mut cmd = Command::new(env!("CARGO_BIN_EXE_yarn-prune"));
  cmd.env_remove("PRUNE_SCOPE").env_remove("PRUNE_OUT_DIR").env_remove("RUST_LOG");
  cmd
}

#[test]
fn test_help_exits_zero() {
  yarn_prune().arg("--help").assert().success();
}

#[test]
fn test_missing_scope_exits_one() {
  yarn_prune().assert().code(1).stderr(predicate::str::contains("--scope"));
}

#[test]
fn test_empty_scope_exits_one() {
  yarn_prune()
    .args(["--scope", ""])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("at least one target must be specified"));
}

#[test]
fn test_positional_argument_exits_one() {
  yarn_prune().args(["--scope", "b", "extra"]).assert().code(1);
}

#[test]
fn test_unknown_scope_exits_one() {
  let repo = copy_fixture("classic-monorepo");
  yarn_prune()
    .arg("--cwd")
    .arg(repo.path())
    .args(["--scope", "does-not-exist"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("does-not-exist"));
}

#[test]
fn test_prune_lists_every_target() {
  let repo = copy_fixture("berry-monorepo");
  yarn_prune()
    .arg("--cwd")
    .arg(repo.path())
    .args(["--scope", "b"])
    .assert()
    .success()
    .stdout(predicate::str::contains(" - Added b\n - Added a\n"));
  assert!(repo.path().join("out/yarn.lock").is_file());
}
