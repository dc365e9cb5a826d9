mod common;

use bookstore_cartservice::app_error::CartError;
use common::{price, test_app};
use uuid::Uuid;

#[tokio::test]
async fn checkout_snapshots_the_cart_and_empties_it() {
    let app = test_app();
    let user = Uuid::new_v4();
    app.catalog.put_book(1, "Dune", price("9.99")).await;
    app.catalog.put_book(2, "Emma", price("4.50")).await;

    app.carts.add_item(user, 1, 1).await.unwrap();
    app.carts.add_item(user, 1, 2).await.unwrap();
    app.carts.add_item(user, 2, 1).await.unwrap();
    assert_eq!(app.carts.item_count(user).await.unwrap(), 2);

    let order = app.orders.checkout(user).await.unwrap();
    assert_eq!(order.user_id, user);
    assert_eq!(order.status, "PENDING");
    assert!(!order.is_deleted);

    assert_eq!(app.carts.item_count(user).await.unwrap(), 0);

    let orders = app.orders.my_orders(user).await.unwrap();
    assert_eq!(orders.len(), 1);
    let view = &orders[0];
    assert_eq!(view.order.id, order.id);
    assert_eq!(view.lines.len(), 2);
    assert_eq!(view.lines[0].book_id, 1);
    assert_eq!(view.lines[0].quantity, 3);
    assert_eq!(view.lines[0].unit_price, price("9.99"));
    assert_eq!(view.lines[1].book_id, 2);
    assert_eq!(view.lines[1].quantity, 1);
    assert_eq!(view.lines[1].unit_price, price("4.50"));
    assert_eq!(view.total_price, price("34.47"));
}

#[tokio::test]
async fn checkout_of_an_emptied_cart_fails_without_an_order() {
    let app = test_app();
    let user = Uuid::new_v4();
    app.catalog.put_book(1, "Dune", price("9.99")).await;

    app.carts.add_item(user, 1, 1).await.unwrap();
    app.carts.remove_item(user, 1).await.unwrap();

    let err = app.orders.checkout(user).await.unwrap_err();
    assert!(matches!(err, CartError::EmptyCart));
    assert!(app.orders.my_orders(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn checkout_without_a_cart_fails() {
    let app = test_app();
    let user = Uuid::new_v4();

    let err = app.orders.checkout(user).await.unwrap_err();
    assert!(matches!(err, CartError::CartNotFound));
}

#[tokio::test]
async fn checkout_is_not_idempotent() {
    let app = test_app();
    let user = Uuid::new_v4();
    app.catalog.put_book(1, "Dune", price("9.99")).await;
    app.carts.add_item(user, 1, 1).await.unwrap();

    app.orders.checkout(user).await.unwrap();

    // The second call sees the emptied cart; that is the terminal state,
    // not something to suppress.
    let err = app.orders.checkout(user).await.unwrap_err();
    assert!(matches!(err, CartError::EmptyCart));
    assert_eq!(app.orders.my_orders(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn a_storage_failure_mid_checkout_rolls_back_completely() {
    let app = test_app();
    let user = Uuid::new_v4();
    app.catalog.put_book(1, "Dune", price("9.99")).await;
    app.catalog.put_book(2, "Emma", price("4.50")).await;

    app.carts.add_item(user, 1, 3).await.unwrap();
    app.carts.add_item(user, 2, 1).await.unwrap();

    app.store.set_fail_next_checkout(true);
    let err = app.orders.checkout(user).await.unwrap_err();
    assert!(matches!(err, CartError::CheckoutFailed));

    // No order is visible and the cart is exactly as it was.
    assert!(app.orders.my_orders(user).await.unwrap().is_empty());
    assert_eq!(app.carts.item_count(user).await.unwrap(), 2);
    let cart = app.carts.get_cart(user).await.unwrap();
    assert_eq!(cart.lines[0].quantity, 3);
    assert_eq!(cart.lines[1].quantity, 1);

    // The same cart checks out cleanly once the fault clears.
    let order = app.orders.checkout(user).await.unwrap();
    assert_eq!(app.carts.item_count(user).await.unwrap(), 0);
    assert_eq!(app.orders.my_orders(user).await.unwrap()[0].order.id, order.id);
}

#[tokio::test]
async fn order_lines_keep_their_price_snapshot() {
    let app = test_app();
    let user = Uuid::new_v4();
    app.catalog.put_book(1, "Dune", price("9.99")).await;

    app.carts.add_item(user, 1, 2).await.unwrap();
    app.orders.checkout(user).await.unwrap();

    // Catalog repricing after checkout must not reach the order snapshot.
    app.catalog.set_price(1, price("19.99")).await;

    let orders = app.orders.my_orders(user).await.unwrap();
    assert_eq!(orders[0].lines[0].unit_price, price("9.99"));
    assert_eq!(orders[0].lines[0].line_total, price("19.98"));
}

#[tokio::test]
async fn adding_after_checkout_reuses_the_emptied_cart() {
    let app = test_app();
    let user = Uuid::new_v4();
    app.catalog.put_book(1, "Dune", price("9.99")).await;
    app.catalog.put_book(2, "Emma", price("4.50")).await;

    app.carts.add_item(user, 1, 1).await.unwrap();
    app.orders.checkout(user).await.unwrap();

    assert_eq!(app.carts.add_item(user, 2, 1).await.unwrap(), 1);
    let cart = app.carts.get_cart(user).await.unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].book_id, 2);

    let order = app.orders.checkout(user).await.unwrap();
    let orders = app.orders.my_orders(user).await.unwrap();
    assert_eq!(orders.len(), 2);
    // Most recent first.
    assert_eq!(orders[0].order.id, order.id);
}

#[tokio::test]
async fn checkout_retries_transient_conflicts() {
    let app = test_app();
    let user = Uuid::new_v4();
    app.catalog.put_book(1, "Dune", price("9.99")).await;
    app.carts.add_item(user, 1, 1).await.unwrap();

    app.store.inject_conflicts(1);
    app.orders.checkout(user).await.unwrap();
    assert_eq!(app.carts.item_count(user).await.unwrap(), 0);
}
