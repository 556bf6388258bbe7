use pretty_assertions::assert_eq;

use super::*;

fn int() -> Type {
    Type::value(Name::from_raw(1))
}

fn string() -> Type {
    Type::value(Name::from_raw(2))
}

fn list(of: Type) -> Type {
    Type::applied(Name::from_raw(3), vec![of])
}

#[test]
fn template_binds_to_concrete() {
    let mut state = TypeState::new();
    let t = state.fresh_var(Name::from_raw(9));
    assert_eq!(state.unify(&t, &int()), Ok(int()));
    assert_eq!(state.resolve(&t), int());
}

#[test]
fn concrete_binds_template_on_the_right() {
    let mut state = TypeState::new();
    let t = state.fresh_var(Name::from_raw(9));
    assert_eq!(state.unify(&list(int()), &t), Ok(list(int())));
    assert_eq!(state.resolve(&t), list(int()));
}

#[test]
fn two_unknowns_share_a_fresh_variable() {
    let mut state = TypeState::new();
    let a = state.fresh_var(Name::from_raw(9));
    let b = state.fresh_var(Name::from_raw(9));
    let joined = state.unify(&a, &b).unwrap_or(Type::Void);
    assert!(joined.is_template());
    assert_ne!(joined, a);
    assert_ne!(joined, b);

    state.unify(&a, &string()).unwrap_or(Type::Void);
    assert_eq!(state.resolve(&b), string());
}

#[test]
fn known_template_propagates() {
    let mut state = TypeState::new();
    let a = state.fresh_var(Name::from_raw(9));
    let b = state.fresh_var(Name::from_raw(9));
    state.unify(&a, &int()).unwrap_or(Type::Void);
    assert_eq!(state.unify(&a, &b), Ok(int()));
    assert_eq!(state.resolve(&b), int());
}

#[test]
fn differing_names_do_not_unify() {
    let mut state = TypeState::new();
    assert_eq!(
        state.unify(&int(), &string()),
        Err(UnifyError::Mismatch {
            left: int(),
            right: string(),
        })
    );
}

#[test]
fn differing_shapes_do_not_unify() {
    let mut state = TypeState::new();
    let f = Type::function(int(), Vec::new(), Vec::new());
    assert!(matches!(
        state.unify(&f, &int()),
        Err(UnifyError::Mismatch { .. })
    ));
    assert!(matches!(
        state.unify(&Type::pointer(int()), &int()),
        Err(UnifyError::Mismatch { .. })
    ));
}

#[test]
fn value_arity_mismatch_is_internal() {
    let mut state = TypeState::new();
    let bad = Type::applied(Name::from_raw(3), vec![int(), int()]);
    let err = state.unify(&list(int()), &bad);
    assert!(matches!(err, Err(ref e) if e.is_internal()));
}

#[test]
fn function_param_count_mismatch() {
    let mut state = TypeState::new();
    let one = Type::function(int(), vec![int()], Vec::new());
    let two = Type::function(int(), vec![int(), int()], Vec::new());
    assert_eq!(
        state.unify(&one, &two),
        Err(UnifyError::ParamArity { left: 1, right: 2 })
    );
}

#[test]
fn function_types_unify_pointwise() {
    let mut state = TypeState::new();
    let t = state.fresh_var(Name::from_raw(9));
    let r = state.fresh_var(Name::from_raw(10));
    let generic = Type::function(r.clone(), vec![t.clone()], Vec::new());
    let concrete = Type::function(string(), vec![int()], Vec::new());
    assert_eq!(state.unify(&generic, &concrete), Ok(concrete));
    assert_eq!(state.resolve(&t), int());
    assert_eq!(state.resolve(&r), string());
}

#[test]
fn void_absorbs_concrete_types() {
    let mut state = TypeState::new();
    assert_eq!(state.unify(&Type::Void, &int()), Ok(Type::Void));
    assert_eq!(state.unify(&list(int()), &Type::Void), Ok(Type::Void));
}

#[test]
fn unknown_template_is_bound_to_void() {
    let mut state = TypeState::new();
    let t = state.fresh_var(Name::from_raw(9));
    assert_eq!(state.unify(&t, &Type::Void), Ok(Type::Void));
    assert_eq!(state.resolve(&t), Type::Void);
    // Bound now, so a later concrete type is absorbed instead of bound.
    assert_eq!(state.unify(&t, &int()), Ok(Type::Void));
    assert_eq!(state.resolve(&t), Type::Void);
}

#[test]
fn occurs_check_rejects_infinite_types() {
    let mut state = TypeState::new();
    let t = state.fresh_var(Name::from_raw(9));
    let err = state.unify(&t, &list(t.clone()));
    assert!(matches!(err, Err(UnifyError::InfiniteType { .. })));
}

#[test]
fn identical_template_unifies_with_itself() {
    let mut state = TypeState::new();
    let t = state.fresh_var(Name::from_raw(9));
    assert_eq!(state.unify(&t, &t), Ok(t.clone()));
    assert_eq!(state.unify(&list(t.clone()), &list(t.clone())), Ok(list(t)));
}

#[test]
fn error_display() {
    assert_eq!(
        UnifyError::ParamArity { left: 1, right: 2 }.to_string(),
        "function types take 1 and 2 parameters"
    );
}
