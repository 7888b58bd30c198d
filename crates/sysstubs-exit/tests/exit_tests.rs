use mockall::mock;
use mockall::predicate::eq;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Barrier};
use std::thread;
use sysstubs_core::ambient::{self, Permission, PolicyViolation, SecurityPolicy};
use sysstubs_core::ScopeError;
use sysstubs_exit::{catch_system_exit, with_security_policy, ExitSignal, PolicyId};

mock! {
    Policy {}

    impl SecurityPolicy for Policy {
        fn check_permission(&self, permission: &Permission) -> Result<(), PolicyViolation>;
        fn in_check(&self) -> bool;
        fn context(&self) -> Option<String>;
    }
}

impl std::fmt::Debug for MockPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPolicy").finish()
    }
}

fn same_policy(a: Option<Arc<dyn SecurityPolicy>>, b: Option<Arc<dyn SecurityPolicy>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(&a, &b),
        _ => false,
    }
}

#[test]
#[serial]
fn exit_from_worker_thread_is_observed() {
    let status = catch_system_exit(|| -> anyhow::Result<()> {
        let worker = thread::spawn(|| ambient::exit(7));
        assert!(worker.join().is_err());
        Ok(())
    })
    .unwrap();
    assert_eq!(status, 7);
}

#[test]
#[serial]
fn racing_threads_record_one_status() {
    let status = catch_system_exit(|| -> anyhow::Result<()> {
        let barrier = Arc::new(Barrier::new(2));
        let workers: Vec<_> = [1, 2]
            .into_iter()
            .map(|code| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    ambient::exit(code)
                })
            })
            .collect();
        for worker in workers {
            assert!(worker.join().is_err());
        }
        Ok(())
    })
    .unwrap();
    assert!(status == 1 || status == 2);
}

#[test]
#[serial]
fn work_error_propagates_and_restores_policy() {
    let before = ambient::security_policy();
    let result = catch_system_exit(|| -> anyhow::Result<()> { anyhow::bail!("work failed") });
    assert_eq!(result.unwrap_err().to_string(), "work failed");
    assert!(same_policy(before, ambient::security_policy()));
}

#[test]
#[serial]
fn unrelated_panic_keeps_unwinding() {
    let before = ambient::security_policy();
    let payload = panic::catch_unwind(|| {
        catch_system_exit(|| -> Result<(), ScopeError> { panic!("unrelated") })
    })
    .unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"unrelated"));
    assert!(same_policy(before, ambient::security_policy()));
}

#[test]
#[serial]
fn foreign_exit_signal_is_not_swallowed() {
    let foreign = ExitSignal {
        policy: PolicyId::fresh(),
        status: 5,
    };
    let payload = panic::catch_unwind(AssertUnwindSafe(|| {
        catch_system_exit(|| -> Result<(), ScopeError> { panic::panic_any(foreign) })
    }))
    .unwrap_err();
    assert_eq!(payload.downcast_ref::<ExitSignal>(), Some(&foreign));
}

#[test]
#[serial]
fn nested_scopes_each_catch_their_own_exit() {
    let outer = catch_system_exit(|| -> anyhow::Result<()> {
        let inner = catch_system_exit(|| -> anyhow::Result<()> { ambient::exit(1) })?;
        assert_eq!(inner, 1);
        ambient::exit(2)
    })
    .unwrap();
    assert_eq!(outer, 2);
}

#[test]
#[serial]
fn non_exit_checks_delegate_to_previous_policy() {
    let mut previous = MockPolicy::new();
    previous
        .expect_check_permission()
        .with(eq(Permission::Listen { port: 8080 }))
        .times(1)
        .returning(|permission| Err(PolicyViolation::new(permission.clone(), "no servers")));
    previous.expect_in_check().times(1).return_const(true);
    previous
        .expect_context()
        .times(1)
        .returning(|| Some("test context".to_string()));

    let status = with_security_policy(Arc::new(previous), || {
        catch_system_exit(|| -> anyhow::Result<()> {
            let denied = ambient::check_permission(&Permission::Listen { port: 8080 });
            assert_eq!(denied.unwrap_err().reason, "no servers");
            let policy = ambient::security_policy().unwrap();
            assert!(policy.in_check());
            assert_eq!(policy.context().as_deref(), Some("test context"));
            ambient::exit(0)
        })
    })
    .unwrap();

    assert_eq!(status, 0);
}

#[test]
#[serial]
fn permissive_without_previous_policy() {
    let before = ambient::set_security_policy(None);
    let status = catch_system_exit(|| -> anyhow::Result<()> {
        assert!(ambient::check_permission(&Permission::Exec {
            command: "ls".to_string(),
        })
        .is_ok());
        ambient::exit(3)
    });
    ambient::set_security_policy(before);
    assert_eq!(status.unwrap(), 3);
}
