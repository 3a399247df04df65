//! Termination by a real SIGINT delivered to this process.
//!
//! Kept alone in its own test binary: the signal targets the whole process.

use std::process::Command;

use mctpd::binding::MCTP_BASE_PATH;
use mctpd::lifecycle::{Daemon, LifecycleState, Options};

mod common;

use common::Workspace;

#[test]
fn test_sigint_destroys_binding_and_stops_loop() {
    let workspace = Workspace::new();
    let mut daemon = Daemon::new(Options {
        binding: "smbus".into(),
        config_path: workspace.smbus_config("MCTP-smbus"),
    })
    .unwrap();
    daemon.start().unwrap();

    let server = daemon.object_server().unwrap().clone();
    assert_eq!(server.object_paths(), vec![MCTP_BASE_PATH.to_string()]);

    let state = daemon.state_watch();
    let watcher = state.clone();
    let killer = std::thread::spawn(move || {
        common::wait_for_state(&watcher, LifecycleState::Running);
        let status = Command::new("kill")
            .args(["-INT", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
    });

    daemon.run();
    killer.join().unwrap();

    assert_eq!(*state.borrow(), LifecycleState::Stopped);
    assert!(server.object_paths().is_empty());
}
