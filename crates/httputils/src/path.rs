// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Routed path parameter scanning

use std::{fmt::Display, str::FromStr};

use axum::{
    extract::{FromRequestParts, RawPathParams, rejection::RawPathParamsRejection},
    http::request::Parts,
};

use crate::error::PathParamError;

/// Extract the routed path variable `name` and parse it into `T`
///
/// The routed variables are the ones captured by the axum router, e.g. `id`
/// for a route declared as `/users/{id}`. Surrounding whitespace is ignored,
/// the rest of the value has to parse as a whole: `23abc` is rejected rather
/// than read as its leading `23`, and a `String` keeps inner spaces instead of
/// stopping at the first one.
pub async fn scan_path_parameter<T>(parts: &mut Parts, name: &str) -> Result<T, PathParamError>
where
    T: FromStr,
    T::Err: Display,
{
    let params = match RawPathParams::from_request_parts(parts, &()).await {
        Ok(params) => params,
        Err(RawPathParamsRejection::MissingPathParams(_)) => {
            return Err(PathParamError::Missing {
                name: name.to_string(),
            });
        }
        Err(rejection) => {
            return Err(PathParamError::Rejected {
                message: rejection.body_text(),
            });
        }
    };

    let Some((_, value)) = params.iter().find(|(key, _)| *key == name) else {
        return Err(PathParamError::Missing {
            name: name.to_string(),
        });
    };

    value
        .trim()
        .parse::<T>()
        .map_err(|err| PathParamError::Parse {
            name: name.to_string(),
            value: value.to_string(),
            message: err.to_string(),
        })
}
