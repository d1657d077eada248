use std::collections::HashSet;
use std::sync::Arc;

use flame_core::FlameError;
use flame_mb::MessageBoardManager;
use flame_mem::{AgentMemory, AgentShadow};

use crate::context::FlameContext;

fn circle_shadow_read_only_x() -> (Arc<AgentMemory>, AgentShadow) {
    let mut mem = AgentMemory::new("Circle");
    mem.register_var::<i64>("x_int").unwrap();
    mem.register_var::<f64>("z_dbl").unwrap();
    mem.hint_population(1);
    mem.get_vector::<i64>("x_int").unwrap().push(41);
    mem.get_vector::<f64>("z_dbl").unwrap().push(1.5);
    mem.push_row_alive();
    let mem = Arc::new(mem);
    let mut shadow = AgentShadow::new(Arc::clone(&mem));
    shadow.allow_access("x_int", false).unwrap();
    (mem, shadow)
}

// Scenario D.
#[test]
fn set_mem_on_read_only_var_is_access_denied() {
    let (_mem, shadow) = circle_shadow_read_only_x();
    let it = shadow.memory_iterator().unwrap();
    let manager = Arc::new(MessageBoardManager::new());
    let client = flame_mb::MessageClient::new(manager, HashSet::new(), HashSet::new());
    let ctx = FlameContext::new(&shadow, &it, &client);

    let err = ctx.set_mem::<i64>("x_int", 99).unwrap_err();
    assert!(matches!(err, FlameError::AccessDenied(_)));
}

#[test]
fn get_mem_wrong_type_is_type_mismatch() {
    let (_mem, shadow) = circle_shadow_read_only_x();
    let it = shadow.memory_iterator().unwrap();
    let manager = Arc::new(MessageBoardManager::new());
    let client = flame_mb::MessageClient::new(manager, HashSet::new(), HashSet::new());
    let ctx = FlameContext::new(&shadow, &it, &client);

    let err = ctx.get_mem::<f64>("x_int").unwrap_err();
    assert!(matches!(err, FlameError::TypeMismatch(_)));
}

#[test]
fn get_mem_outside_acl_is_access_denied() {
    let (_mem, shadow) = circle_shadow_read_only_x();
    let it = shadow.memory_iterator().unwrap();
    let manager = Arc::new(MessageBoardManager::new());
    let client = flame_mb::MessageClient::new(manager, HashSet::new(), HashSet::new());
    let ctx = FlameContext::new(&shadow, &it, &client);

    let err = ctx.get_mem::<i64>("z_dbl").unwrap_err();
    assert!(matches!(err, FlameError::AccessDenied(_)));
}

#[test]
fn get_mem_reads_current_row() {
    let (_mem, shadow) = circle_shadow_read_only_x();
    let it = shadow.memory_iterator().unwrap();
    let manager = Arc::new(MessageBoardManager::new());
    let client = flame_mb::MessageClient::new(manager, HashSet::new(), HashSet::new());
    let ctx = FlameContext::new(&shadow, &it, &client);

    let x: i64 = ctx.get_mem("x_int").unwrap();
    assert_eq!(x, 41);
}
