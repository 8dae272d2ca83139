use roster::UserAccount;

use crate::helpers::{create_user, test_instance};

#[tokio::test]
async fn test_has_privilege_uses_grants() {
    let (instance, _dir) = test_instance().await;
    let user = create_user(&instance, "alice").await;
    let privileges = instance.privileges();

    assert!(!privileges.has_privilege(user.id, "judge").await.unwrap());
    privileges.set_privileges(user.id, ["judge"]).await.unwrap();
    assert!(privileges.has_privilege(user.id, "judge").await.unwrap());
    assert!(!privileges.has_privilege(user.id, "manage_user").await.unwrap());
}

#[tokio::test]
async fn test_admin_holds_every_privilege() {
    let (instance, _dir) = test_instance().await;
    let admin = instance
        .accounts()
        .create_account(UserAccount::new("root").with_admin(true))
        .await
        .unwrap();
    let privileges = instance.privileges();

    assert!(privileges.has_privilege(admin.id, "anything").await.unwrap());
    // No grant rows were needed
    assert!(privileges.get_privileges(admin.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_has_privilege_unknown_user() {
    let (instance, _dir) = test_instance().await;
    let err = instance
        .privileges()
        .has_privilege(404, "judge")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_edit_permissions() {
    let (instance, _dir) = test_instance().await;
    let alice = create_user(&instance, "alice").await;
    let bob = create_user(&instance, "bob").await;
    let manager = create_user(&instance, "manager").await;
    let admin = instance
        .accounts()
        .create_account(UserAccount::new("root").with_admin(true))
        .await
        .unwrap();
    let privileges = instance.privileges();
    privileges
        .set_privileges(manager.id, ["manage_user"])
        .await
        .unwrap();

    assert!(!privileges.is_allowed_edit_by(alice.id, None).await.unwrap());
    assert!(privileges.is_allowed_edit_by(alice.id, Some(&alice)).await.unwrap());
    assert!(!privileges.is_allowed_edit_by(alice.id, Some(&bob)).await.unwrap());
    assert!(privileges.is_allowed_edit_by(alice.id, Some(&manager)).await.unwrap());
    assert!(privileges.is_allowed_edit_by(alice.id, Some(&admin)).await.unwrap());
}
