//! Process-wide current-instance selector
//!
//! Hosts written against a "select, then operate" calling convention keep
//! that shape here. Instances are shared as `Arc<Mutex<Instance>>`, and the
//! selector itself sits behind a mutex so selection and the operation that
//! follows can run as one critical section through [`with_current`].
//!
//! New code should hold an `Instance` directly and call it; the selector is
//! only needed when several threads take turns on a common entry point.
//!
//! # Lock order
//!
//! The selector mutex is always taken before an instance mutex. Every
//! function here locks the selector (`set_current`, `clear_current`,
//! `current`, `is_current` and `free` included), so none of them may be
//! called while the caller holds an instance lock, or from inside the
//! closures passed to [`with_current`] and [`with_selected`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{ZpdError, ZpdResult};
use crate::instance::Instance;

/// Instance handle that can be selected and shared across threads
pub type SharedInstance = Arc<Mutex<Instance>>;

static CURRENT: Mutex<Option<SharedInstance>> = Mutex::new(None);

fn selector() -> MutexGuard<'static, Option<SharedInstance>> {
    CURRENT.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn share(instance: Instance) -> SharedInstance {
    Arc::new(Mutex::new(instance))
}

/// Select `instance` for subsequent calls without an explicit instance
pub fn set_current(instance: &SharedInstance) {
    *selector() = Some(Arc::clone(instance));
}

pub fn clear_current() {
    *selector() = None;
}

pub fn current() -> Option<SharedInstance> {
    selector().clone()
}

pub fn is_current(instance: &SharedInstance) -> bool {
    selector()
        .as_ref()
        .is_some_and(|current| Arc::ptr_eq(current, instance))
}

/// Run `f` on the selected instance, holding the selector for the duration
///
/// Returns `None` when nothing is selected. The selector stays locked while
/// `f` runs, then the instance is locked inside it; `f` must not call back
/// into this module.
pub fn with_current<R>(f: impl FnOnce(&mut Instance) -> R) -> Option<R> {
    let guard = selector();
    let shared = guard.as_ref()?;
    let mut instance = shared.lock().unwrap_or_else(PoisonError::into_inner);
    Some(f(&mut instance))
}

/// Select `instance` and run `f` on it in one critical section
///
/// Locks the selector, then `instance`. Do not call while holding a lock on
/// any shared instance.
pub fn with_selected<R>(instance: &SharedInstance, f: impl FnOnce(&mut Instance) -> R) -> R {
    let mut guard = selector();
    *guard = Some(Arc::clone(instance));
    let mut locked = instance.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut locked)
}

/// Release a shared instance
///
/// Fails with `InstanceSelected` while it is the current selection and with
/// `InstanceBusy` while another handle still refers to it. On failure the
/// handle comes back with the error.
pub fn free(instance: SharedInstance) -> Result<(), (ZpdError, SharedInstance)> {
    if is_current(&instance) {
        log::error!("free: instance is still selected as current");
        return Err((ZpdError::InstanceSelected, instance));
    }
    match Arc::try_unwrap(instance) {
        Ok(mutex) => {
            let instance = mutex.into_inner().unwrap_or_else(PoisonError::into_inner);
            log::debug!("free: instance {} released", instance.id());
            Ok(())
        }
        Err(instance) => {
            log::error!("free: instance is still in use");
            Err((ZpdError::InstanceBusy, instance))
        }
    }
}

/// `free` that only reports the error kind
pub fn try_free(instance: SharedInstance) -> ZpdResult<()> {
    free(instance).map_err(|(e, _)| e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::ConsoleHistory;

    // The selector is process-wide; tests in this module run their
    // scenarios under one lock.
    static SERIAL: Mutex<()> = Mutex::new(());

    #[test]
    fn test_select_operate_free() {
        let _serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        let history = Arc::new(ConsoleHistory::new());
        let mut a = Instance::new();
        a.set_console_hook(history.clone());
        let a = share(a);
        let b = share(Instance::new());

        set_current(&a);
        assert!(is_current(&a));
        assert!(!is_current(&b));
        with_current(|instance| instance.post_normal("via current")).unwrap();
        assert_eq!(history.len(), 1);

        let (err, a) = free(a).unwrap_err();
        assert!(matches!(err, ZpdError::InstanceSelected));

        with_selected(&b, |instance| instance.post_normal("on b"));
        assert!(is_current(&b));
        assert_eq!(history.len(), 1);

        let extra = Arc::clone(&a);
        let (err, a) = free(a).unwrap_err();
        assert!(matches!(err, ZpdError::InstanceBusy));
        drop(extra);
        assert!(free(a).is_ok());

        clear_current();
        assert!(current().is_none());
        assert!(with_current(|_| ()).is_none());
        assert!(try_free(b).is_ok());
    }

    #[test]
    fn test_selector_then_instance_from_many_threads() {
        let _serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        let history = Arc::new(ConsoleHistory::new());
        let shared: Vec<SharedInstance> = (0..3)
            .map(|_| {
                let mut instance = Instance::new();
                instance.set_console_hook(history.clone());
                share(instance)
            })
            .collect();

        let workers: Vec<_> = shared
            .iter()
            .cloned()
            .map(|mine| {
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        with_selected(&mine, |instance| instance.post_normal("selected"));
                        with_current(|instance| instance.post_normal("current"));
                        // direct use of the instance lock, selector not held
                        mine.lock().unwrap_or_else(PoisonError::into_inner).post_log("direct");
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(history.len(), 3 * 200 * 3);

        clear_current();
        for instance in shared {
            assert!(try_free(instance).is_ok());
        }
    }
}
