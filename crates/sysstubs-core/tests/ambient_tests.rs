use mockall::mock;
use mockall::predicate::eq;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::io;
use std::sync::Arc;
use sysstubs_core::ambient::{self, Channel, Permission, PolicyViolation, SecurityPolicy, Sink};
use sysstubs_core::{sys_eprintln, sys_println, text};

#[derive(Debug, Default)]
struct Collect(Mutex<Vec<u8>>);

impl Sink for Collect {
    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.0.lock().extend_from_slice(buf);
        Ok(())
    }
}

mock! {
    Policy {}

    impl SecurityPolicy for Policy {
        fn check_permission(&self, permission: &Permission) -> Result<(), PolicyViolation>;
        fn in_check(&self) -> bool;
    }
}

impl std::fmt::Debug for MockPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPolicy").finish()
    }
}

#[test]
#[serial]
fn println_uses_current_line_separator() {
    let previous_separator = ambient::set_property("line.separator", "\r\n");
    let out = Arc::new(Collect::default());
    let err = Arc::new(Collect::default());
    let previous_out = ambient::set_sink(Channel::Out, out.clone());
    let previous_err = ambient::set_sink(Channel::Err, err.clone());

    sys_println!("line {}", 1);
    sys_println!();
    sys_eprintln!("oops");

    ambient::set_sink(Channel::Out, previous_out);
    ambient::set_sink(Channel::Err, previous_err);
    match previous_separator {
        Some(separator) => ambient::set_property("line.separator", separator),
        None => ambient::clear_property("line.separator"),
    };

    assert_eq!(out.0.lock().as_slice(), b"line 1\r\n\r\n");
    assert_eq!(err.0.lock().as_slice(), b"oops\r\n");
}

#[test]
#[serial]
fn encoding_follows_property() {
    let previous = ambient::set_property("file.encoding", "ISO-8859-1");
    assert_eq!(text::decode(&[0x4A, 0xF6]), "Jö");
    match previous {
        Some(label) => ambient::set_property("file.encoding", label),
        None => ambient::clear_property("file.encoding"),
    };
    assert_eq!(text::decode("Jö".as_bytes()), "Jö");
}

#[test]
#[serial]
fn exit_consults_installed_policy() {
    let mut policy = MockPolicy::new();
    policy
        .expect_check_permission()
        .with(eq(Permission::Exit { status: 4 }))
        .times(1)
        .returning(|permission| Err(PolicyViolation::new(permission.clone(), "tests never exit")));
    let previous = ambient::set_security_policy(Some(Arc::new(policy)));

    let result = std::panic::catch_unwind(|| ambient::exit(4));
    ambient::set_security_policy(previous);

    let payload = result.unwrap_err();
    let violation = payload.downcast_ref::<PolicyViolation>().unwrap();
    assert_eq!(violation.reason, "tests never exit");
}

#[test]
#[serial]
fn permission_checks_reach_the_policy() {
    let mut policy = MockPolicy::new();
    policy
        .expect_check_permission()
        .withf(|permission| matches!(permission, Permission::FileRead { path } if path == "/etc/hosts"))
        .times(1)
        .returning(|_| Ok(()));
    let previous = ambient::set_security_policy(Some(Arc::new(policy)));

    let result = ambient::check_permission(&Permission::FileRead {
        path: "/etc/hosts".to_string(),
    });
    ambient::set_security_policy(previous);

    assert!(result.is_ok());
}
