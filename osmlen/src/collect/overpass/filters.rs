/// One category of ways, expressed as an Overpass way selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfrastructureFilter {
    /// Column name used in reports.
    pub name: &'static str,
    /// Overpass selector, scoped to a polygon when the query is built.
    pub expression: &'static str,
}

impl InfrastructureFilter {
    pub const fn new(name: &'static str, expression: &'static str) -> Self {
        InfrastructureFilter { name, expression }
    }
}

/// Ways measured per boundary. Order is significant: results are matched by position.
///
/// The first entry counts every road and path. The other seven are cycling
/// infrastructure, each excluding what the earlier ones already matched so that
/// nothing is counted twice. Contraflow permissions (`cycleway=opposite`) are not
/// counted as infrastructure.
pub const INFRASTRUCTURE_FILTERS: [InfrastructureFilter; 8] = [
    InfrastructureFilter::new("all_ways", "way[highway]"),
    InfrastructureFilter::new("cycleway", "way[highway=cycleway]"),
    InfrastructureFilter::new(
        "motor_vehicle_no",
        "way[highway][highway!=cycleway][motor_vehicle=no]",
    ),
    InfrastructureFilter::new(
        "vehicle_no",
        "way[highway][highway!=cycleway][motor_vehicle!=no][vehicle=no]",
    ),
    InfrastructureFilter::new(
        "bicycle_designated",
        "way[highway!=cycleway][motor_vehicle!=no][vehicle!=no][bicycle=designated]",
    ),
    InfrastructureFilter::new(
        "cycle_lane",
        "way[highway!=cycleway][motor_vehicle!=no][vehicle!=no][bicycle!=designated][cycleway][cycleway!=opposite][cycleway!=separate][cycleway!=no]",
    ),
    InfrastructureFilter::new(
        "cycle_lane_left",
        "way[highway!=cycleway][motor_vehicle!=no][vehicle!=no][bicycle!=designated][\"cycleway:left\"]",
    ),
    InfrastructureFilter::new(
        "cycle_lane_right",
        "way[highway!=cycleway][motor_vehicle!=no][vehicle!=no][bicycle!=designated][\"cycleway:right\"]",
    ),
];
