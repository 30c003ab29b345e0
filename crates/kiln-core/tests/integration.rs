//! Integration tests for kiln-core.
//!
//! The ACL and SELinux tests need real host tools and are ignored by default.
//! Run with: `cargo test -p kiln-core -- --ignored`

use kiln_core::{probe, run, KilnError, RunOptions, Volume};
use std::fs;
use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

/// Volume with permissions and a target renders the expected mount argument.
#[test]
fn test_volume_mount_end_to_end() {
    let mut volume = Volume::builder().permissions("0755").create().unwrap();
    let dir = volume.directory().to_path_buf();

    let mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o755);

    volume.set_target("/data");
    assert_eq!(
        volume.mount_argument().unwrap(),
        format!("-v {}:/data", dir.display())
    );

    volume.set_force_selinux_relabel(true);
    assert_eq!(
        volume.mount_argument().unwrap(),
        format!("-v {}:/data:Z", dir.display())
    );

    let (source, target) = volume.as_pair();
    assert_eq!(source, dir);
    assert_eq!(target.unwrap().to_str(), Some("/data"));

    volume.clean().unwrap();
    assert!(fs::metadata(&dir).is_err());
}

/// Relabel flag and target can be given at construction time.
#[test]
fn test_volume_builder_target_and_relabel() {
    let volume = Volume::builder()
        .target("/var/lib/app")
        .force_selinux_relabel(true)
        .create()
        .unwrap();

    assert!(volume.force_selinux_relabel());
    assert!(volume.mount_argument().unwrap().ends_with(":/var/lib/app:Z"));
    volume.clean().unwrap();
}

/// Files written through the volume directory disappear with `clean`.
#[test]
fn test_clean_removes_contents() {
    let volume = Volume::new().unwrap();
    let nested = volume.directory().join("nested");
    fs::create_dir(&nested).unwrap();
    fs::write(nested.join("file.txt"), "content").unwrap();

    let dir = volume.directory().to_path_buf();
    volume.clean().unwrap();
    assert!(!dir.exists());
    assert!(!probe::check_file_exists(&dir));
}

/// Port and file probes succeed once their condition holds.
#[test]
fn test_wait_for_port_then_file() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    probe::wait_for_port("127.0.0.1", port, 3, Duration::from_millis(10)).unwrap();

    let volume = Volume::new().unwrap();
    let marker = volume.directory().join("ready");
    run(
        ["touch", marker.to_str().unwrap()],
        &RunOptions::default(),
    )
    .unwrap();
    assert_eq!(
        probe::wait_for_file(&marker, 1, Duration::from_millis(10)).unwrap(),
        1
    );
    volume.clean().unwrap();
}

/// Polling a closed port exhausts its attempts.
#[test]
fn test_wait_for_closed_port_exhausts() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = probe::wait_for_port("127.0.0.1", port, 2, Duration::from_millis(10)).unwrap_err();
    assert!(matches!(err, KilnError::PollExhausted { attempts: 2 }));
}

/// ACL rules are applied with the host's setfacl.
#[test]
#[ignore = "requires setfacl and an ACL-capable filesystem"]
fn test_volume_acl() {
    let volume = Volume::builder()
        .acl_rules(["u:65534:rwx"])
        .create()
        .unwrap();

    let acl = run(
        ["getfacl", "-p", volume.directory().to_str().unwrap()],
        &RunOptions::default(),
    )
    .unwrap();
    assert!(String::from_utf8_lossy(&acl).contains("user:65534:rwx"));
    volume.clean().unwrap();
}

/// The SELinux type is applied with the host's chcon.
#[test]
#[ignore = "requires chcon on an SELinux-enabled host"]
fn test_volume_selinux() {
    let volume = Volume::new().unwrap();
    volume.set_selinux("container_file_t").unwrap();

    let label = run(
        ["stat", "-c", "%C", volume.directory().to_str().unwrap()],
        &RunOptions::default(),
    )
    .unwrap();
    assert!(String::from_utf8_lossy(&label).contains("container_file_t"));
    volume.clean().unwrap();
}
