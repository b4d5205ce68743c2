use preload_domain::constants::{LOCAL_PROJECT_ID, NAMESPACE, PROD_PROJECT_ID};

#[test]
fn local_and_production_projects_never_collide() {
    assert_eq!(NAMESPACE, "hstspreload");
    assert_eq!(PROD_PROJECT_ID, "hstspreload");
    assert_eq!(LOCAL_PROJECT_ID, "hstspreload-local");
    assert_ne!(LOCAL_PROJECT_ID, PROD_PROJECT_ID);
}
