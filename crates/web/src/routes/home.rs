//! Dashboard route handlers.
//!
//! All routes require a logged-in member of the request's foodcoop.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::Method,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;

use foodcoop_core::{GroupId, MembershipId, TransactionSort};

use super::Page;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{RequireUser, Scope, set_notice};
use crate::models::{FinancialTransaction, Group, MembershipWithGroup, User};
use crate::services::reference::payment_reference;
use crate::services::{DashboardTasks, ProfileForm, ProfileOutcome, ProfileParams, ProfileService};
use crate::state::AppState;

/// Notice shown after a profile submission that passed validation.
pub const PROFILE_SAVED_NOTICE: &str = "Your changes have been saved.";

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters of the ordergroup page.
#[derive(Debug, Default, Deserialize)]
pub struct OrdergroupQuery {
    pub sort: Option<String>,
}

/// Identifies the membership to cancel. `group_id` wins if both are given.
#[derive(Debug, Default, Deserialize)]
pub struct CancelMembershipQuery {
    pub group_id: Option<String>,
    pub membership_id: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "home/index.html")]
pub struct HomeIndexTemplate {
    pub page: Page,
    pub first_name: String,
    pub tasks: DashboardTasks,
    pub ordergroup: Option<Group>,
}

/// Profile form template.
#[derive(Template, WebTemplate)]
#[template(path = "home/profile.html")]
pub struct ProfileTemplate {
    pub page: Page,
    pub form: ProfileForm,
    pub ordergroup: Option<Group>,
    pub memberships: Vec<MembershipWithGroup>,
}

/// Reference calculator template.
#[derive(Template, WebTemplate)]
#[template(path = "home/reference_calculator.html")]
pub struct ReferenceCalculatorTemplate {
    pub page: Page,
    pub ordergroup: Group,
    pub reference: String,
    pub bank_name: Option<String>,
    pub bank_iban: Option<String>,
}

/// Sort parameter each column header links to.
pub struct SortLinks {
    pub date: &'static str,
    pub note: &'static str,
    pub amount: &'static str,
}

impl SortLinks {
    fn for_current(sort: TransactionSort) -> Self {
        Self {
            date: sort.toggle_for(TransactionSort::Date).as_str(),
            note: sort.toggle_for(TransactionSort::Note).as_str(),
            amount: sort.toggle_for(TransactionSort::Amount).as_str(),
        }
    }
}

/// Ordergroup account template.
#[derive(Template, WebTemplate)]
#[template(path = "home/ordergroup.html")]
pub struct OrdergroupTemplate {
    pub page: Page,
    pub ordergroup: Group,
    pub members: Vec<User>,
    pub balance: Decimal,
    pub transactions: Vec<FinancialTransaction>,
    pub sort: &'static str,
    pub links: SortLinks,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the task dashboard.
pub async fn index(
    State(state): State<AppState>,
    RequireUser { user, scope }: RequireUser,
    session: Session,
) -> Result<HomeIndexTemplate> {
    let store = state.store();
    let open = store.open_tasks().await?;
    let tasks = DashboardTasks::classify(open, user.id, Utc::now().date_naive());
    let ordergroup = store.ordergroup_for_user(user.id).await?;

    Ok(HomeIndexTemplate {
        page: Page::new(&state, &scope, Some(&user), &session).await,
        first_name: user.first_name,
        tasks,
        ordergroup,
    })
}

/// Display the profile form.
pub async fn profile(
    State(state): State<AppState>,
    RequireUser { user, scope }: RequireUser,
    session: Session,
) -> Result<ProfileTemplate> {
    let ordergroup = state.store().ordergroup_for_user(user.id).await?;
    let form = ProfileForm::from_user(&user, ordergroup.as_ref());
    render_profile(&state, &scope, &user, &session, form, ordergroup).await
}

/// Handle a profile submission.
///
/// Query parameters are used for `GET`, the form body otherwise. Passwords
/// are only taken from a body, never from a URL.
pub async fn update_profile(
    State(state): State<AppState>,
    RequireUser { user, scope }: RequireUser,
    session: Session,
    method: Method,
    Form(mut params): Form<ProfileParams>,
) -> Result<Response> {
    if method == Method::GET {
        params.password = None;
        params.password_confirmation = None;
    }
    let ordergroup = state.store().ordergroup_for_user(user.id).await?;

    match ProfileService::new(state.store())
        .update(&user, ordergroup.as_ref(), &params)
        .await?
    {
        ProfileOutcome::Unchanged | ProfileOutcome::Saved(_) => {
            set_notice(&session, PROFILE_SAVED_NOTICE).await?;
            Ok(Redirect::to(&scope.path("/home/profile")).into_response())
        }
        ProfileOutcome::Invalid(form) => {
            let template =
                render_profile(&state, &scope, &user, &session, form, ordergroup).await?;
            Ok(template.into_response())
        }
    }
}

async fn render_profile(
    state: &AppState,
    scope: &Scope,
    user: &User,
    session: &Session,
    form: ProfileForm,
    ordergroup: Option<Group>,
) -> Result<ProfileTemplate> {
    let memberships = state.store().memberships_for_user(user.id).await?;

    Ok(ProfileTemplate {
        page: Page::new(state, scope, Some(user), session).await,
        form,
        ordergroup,
        memberships,
    })
}

/// Display the bank-transfer reference of the member's ordergroup.
pub async fn reference_calculator(
    State(state): State<AppState>,
    RequireUser { user, scope }: RequireUser,
    session: Session,
) -> Result<Response> {
    let Some(ordergroup) = state.store().ordergroup_for_user(user.id).await? else {
        return Ok(Redirect::to(&scope.path("/home")).into_response());
    };

    let bank = &state.config().bank;
    Ok(ReferenceCalculatorTemplate {
        page: Page::new(&state, &scope, Some(&user), &session).await,
        reference: payment_reference(ordergroup.id, user.id),
        ordergroup,
        bank_name: bank.name.clone(),
        bank_iban: bank.iban.clone(),
    }
    .into_response())
}

/// Display the member's ordergroup with its account history.
pub async fn ordergroup(
    State(state): State<AppState>,
    RequireUser { user, scope }: RequireUser,
    session: Session,
    Query(query): Query<OrdergroupQuery>,
) -> Result<Response> {
    let store = state.store();
    let Some(ordergroup) = store.ordergroup_for_user(user.id).await? else {
        return Ok(Redirect::to(&scope.path("/home")).into_response());
    };

    let sort = TransactionSort::from_param(query.sort.as_deref());
    let transactions = store
        .transactions_for_ordergroup(ordergroup.id, sort)
        .await?;
    let balance = store.account_balance(ordergroup.id).await?;
    let members = store.group_members(ordergroup.id).await?;

    Ok(OrdergroupTemplate {
        page: Page::new(&state, &scope, Some(&user), &session).await,
        ordergroup,
        members,
        balance,
        transactions,
        sort: sort.as_str(),
        links: SortLinks::for_current(sort),
    }
    .into_response())
}

/// Leave a group.
///
/// Only the member's own memberships can be cancelled; anything else is a 404.
pub async fn cancel_membership(
    State(state): State<AppState>,
    RequireUser { user, scope }: RequireUser,
    session: Session,
    Query(query): Query<CancelMembershipQuery>,
) -> Result<Redirect> {
    let store = state.store();

    let found = if let Some(raw) = query.group_id.as_deref() {
        let group_id: GroupId = raw.parse().map_err(|_| membership_not_found())?;
        store.find_membership_by_group(user.id, group_id).await?
    } else if let Some(raw) = query.membership_id.as_deref() {
        let membership_id: MembershipId = raw.parse().map_err(|_| membership_not_found())?;
        store.find_membership(user.id, membership_id).await?
    } else {
        None
    };

    let MembershipWithGroup { membership, group } = found.ok_or_else(membership_not_found)?;

    if !store.delete_membership(membership.id).await? {
        return Err(membership_not_found());
    }

    tracing::info!(
        user_id = %user.id,
        group_id = %group.id,
        "Membership cancelled"
    );
    add_breadcrumb("membership", "Membership cancelled", &[("group", &group.name)]);

    set_notice(
        &session,
        format!("You are no longer a member of {}.", group.name),
    )
    .await?;
    Ok(Redirect::to(&scope.path("/home/profile")))
}

fn membership_not_found() -> AppError {
    AppError::NotFound("membership".to_string())
}
