//! CLI argument parsing tests for the nlconf command.
//!
//! These tests verify that command-line arguments are correctly parsed
//! without requiring network access or root privileges.

use assert_cmd::Command;
use predicates::prelude::*;

fn nlconf_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_nlconf"))
}

mod global_flags {
    use super::*;

    #[test]
    fn test_help() {
        nlconf_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Agent configuration tree tool"));
    }

    #[test]
    fn test_version() {
        nlconf_cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("nlconf"));
    }

    #[test]
    fn test_invalid_subcommand() {
        nlconf_cmd()
            .arg("invalid_command")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn test_unknown_backend() {
        nlconf_cmd()
            .args(["--backend", "win32", "tree"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown backend"));
    }
}

mod verbs {
    use super::*;

    #[test]
    fn test_get_requires_oid() {
        nlconf_cmd().arg("get").assert().failure();
    }

    #[test]
    fn test_set_requires_value() {
        nlconf_cmd()
            .args(["set", "/agent:Agt_A/env:X"])
            .assert()
            .failure();
    }

    #[test]
    fn test_list_alias() {
        nlconf_cmd()
            .args(["ls", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("List the instances"));
    }

    #[test]
    fn test_commit_help() {
        nlconf_cmd()
            .args(["commit", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Apply staged changes"));
    }
}

mod tree_command {
    use super::*;

    #[test]
    fn test_tree_text() {
        nlconf_cmd()
            .arg("tree")
            .assert()
            .success()
            .stdout(predicate::str::contains("/volatile/arp"))
            .stdout(predicate::str::contains("get,set,add,del,list,commit"))
            .stdout(predicate::str::contains("/interface/net_addr/prefix"));
    }

    #[test]
    fn test_tree_json() {
        nlconf_cmd()
            .args(["-j", "tree"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"path\": \"/interface/net_addr\""));
    }
}

mod batch_command {
    use super::*;

    #[test]
    fn test_missing_file() {
        nlconf_cmd()
            .args(["batch", "/nonexistent/requests.txt"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("read batch file"));
    }

    #[test]
    fn test_bad_line() {
        nlconf_cmd()
            .args(["batch", "-"])
            .write_stdin("get /agent:Agt_A/dns:\nfrob /agent:Agt_A/env:X\n")
            .assert()
            .failure()
            .stderr(predicate::str::contains("line 2"));
    }
}
