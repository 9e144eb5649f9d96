/// 试算表 HTTP 端点后端

pub mod spreadsheet_endpoint_client;

pub use spreadsheet_endpoint_client::{
    build_form_fields, patrol_points_key, SpreadsheetEndpointClient, PATROL_POINT_SEPARATOR,
};
