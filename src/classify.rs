//! Request Classifier: map an inbound request's path to a [`Route`] before
//! any store I/O happens. Pure function of path and configured admin suffix; no I/O.

/// One of the admin sub-operations addressable under `<completion-path><admin_path>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOp {
    TotalQuery,
    TotalRefresh,
    TotalDelta,
    UsedQuery,
    UsedRefresh,
    UsedDelta,
    GateQuery,
    GateSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/v1/chat/completions` exactly: subject to the gate and quota checks.
    Completion,
    /// `/ai-gateway/api/v1/models` exactly.
    Catalogue,
    Admin(AdminOp),
    /// Anything else: forwarded unmodified, no gate or quota involvement.
    PassThrough,
}

const COMPLETION_PATH: &str = "/v1/chat/completions";
const CATALOGUE_PATH: &str = "/ai-gateway/api/v1/models";

/// Classify a request path into a [`Route`]. `admin_path` is the configured suffix
/// (default `/quota`) appended to [`COMPLETION_PATH`] to form the admin base.
///
/// Longer suffixes are checked before shorter ones so e.g. `<base>/used/refresh`
/// is never misclassified as `<base>/used`.
pub fn classify(path: &str, admin_path: &str) -> Route {
    let path = path.trim_end_matches('/');

    if path == COMPLETION_PATH {
        return Route::Completion;
    }
    if path == CATALOGUE_PATH {
        return Route::Catalogue;
    }

    let admin_base = format!("{COMPLETION_PATH}{admin_path}");
    let admin_routes: [(&str, AdminOp); 8] = [
        (&format!("{admin_base}/used/refresh"), AdminOp::UsedRefresh),
        (&format!("{admin_base}/used/delta"), AdminOp::UsedDelta),
        (&format!("{admin_base}/used"), AdminOp::UsedQuery),
        (&format!("{admin_base}/star/set"), AdminOp::GateSet),
        (&format!("{admin_base}/star"), AdminOp::GateQuery),
        (&format!("{admin_base}/refresh"), AdminOp::TotalRefresh),
        (&format!("{admin_base}/delta"), AdminOp::TotalDelta),
        (&admin_base, AdminOp::TotalQuery),
    ];
    for (suffix, op) in &admin_routes {
        if path == *suffix {
            return Route::Admin(*op);
        }
    }

    Route::PassThrough
}
