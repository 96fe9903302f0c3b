//! BDD scenarios for the stack composition workflow.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ComposeContext, compose_context};

#[scenario(
    path = "tests/features/compose.feature",
    name = "Compose a full staging stack"
)]
fn scenario_full_stack(compose_context: ComposeContext) {
    drop(compose_context);
}

#[scenario(
    path = "tests/features/compose.feature",
    name = "Compose a stack without a database"
)]
fn scenario_without_database(compose_context: ComposeContext) {
    drop(compose_context);
}

#[scenario(
    path = "tests/features/compose.feature",
    name = "Compose a stack without a load balancer"
)]
fn scenario_without_balancer(compose_context: ComposeContext) {
    drop(compose_context);
}

#[scenario(
    path = "tests/features/compose.feature",
    name = "Reject a stack with no way to resolve the application host"
)]
fn scenario_unresolvable_host(compose_context: ComposeContext) {
    drop(compose_context);
}

#[scenario(
    path = "tests/features/compose.feature",
    name = "Reject an out-of-bounds schedule before creating anything"
)]
fn scenario_schedule_out_of_bounds(compose_context: ComposeContext) {
    drop(compose_context);
}

#[scenario(
    path = "tests/features/compose.feature",
    name = "Surface artifact publication failures"
)]
fn scenario_publish_failure(compose_context: ComposeContext) {
    drop(compose_context);
}

#[scenario(
    path = "tests/features/compose.feature",
    name = "Abort composition when the network fails"
)]
fn scenario_network_failure(compose_context: ComposeContext) {
    drop(compose_context);
}

#[scenario(
    path = "tests/features/compose.feature",
    name = "Abort composition when credential generation fails"
)]
fn scenario_credential_failure(compose_context: ComposeContext) {
    drop(compose_context);
}

#[scenario(
    path = "tests/features/compose.feature",
    name = "Abort composition when the database fails"
)]
fn scenario_database_failure(compose_context: ComposeContext) {
    drop(compose_context);
}

#[scenario(
    path = "tests/features/compose.feature",
    name = "Abort composition when the fleet fails"
)]
fn scenario_fleet_failure(compose_context: ComposeContext) {
    drop(compose_context);
}

#[scenario(
    path = "tests/features/compose.feature",
    name = "Abort composition when the balancer fails"
)]
fn scenario_balancer_failure(compose_context: ComposeContext) {
    drop(compose_context);
}

#[scenario(
    path = "tests/features/compose.feature",
    name = "Abort composition when a permission edge fails"
)]
fn scenario_permission_failure(compose_context: ComposeContext) {
    drop(compose_context);
}

#[scenario(
    path = "tests/features/compose.feature",
    name = "Surface bootstrap attachment failures"
)]
fn scenario_attach_failure(compose_context: ComposeContext) {
    drop(compose_context);
}
