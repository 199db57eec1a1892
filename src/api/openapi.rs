//! OpenAPI document assembled from the handler annotations.

use utoipa::OpenApi;

use crate::api::dto::{PartnerVisitsResponse, UserBonusResponse};
use crate::api::handlers::{partner, system, user};
use crate::domain::ledger::{PointsHistoryEntry, PointsKind, UserRef, UserStatistics};
use crate::domain::warning::{FetchOperation, FetchWarning};
use crate::domain::{Metrics, Reward};
use crate::error::{ErrorBody, ErrorResponse};

/// OpenAPI description of every public endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "zabava-ledger",
        description = "Read-side visit ledger and loyalty points service"
    ),
    paths(
        partner::partner_visits,
        user::user_bonus,
        system::health_handler,
        system::rewards_handler,
    ),
    components(schemas(
        PartnerVisitsResponse,
        UserBonusResponse,
        Metrics,
        FetchWarning,
        FetchOperation,
        UserRef,
        UserStatistics,
        PointsHistoryEntry,
        PointsKind,
        Reward,
        ErrorResponse,
        ErrorBody,
        system::HealthResponse,
    )),
    tags(
        (name = "Partners", description = "Partner visit ledgers"),
        (name = "Users", description = "Customer points and rewards"),
        (name = "System", description = "Health and configuration"),
    )
)]
pub struct ApiDoc;
