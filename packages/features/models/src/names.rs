//! Feature names written onto cells by the aggregators.

pub const STREETS_MOTORWAYS: &str = "streets_motorways";
pub const STREETS_MAJOR: &str = "streets_major";
pub const STREETS_MINOR: &str = "streets_minor";
pub const STREETS_PEDESTRIAN: &str = "streets_pedestrian";
pub const PUBLIC_TRANSPORT_STATION: &str = "public_transport_station";
pub const PUBLIC_TRANSPORT_STOPS: &str = "public_transport_stops";
pub const PUBLIC_BUILDINGS: &str = "public_buildings";
pub const RESIDENTIAL_BUILDINGS: &str = "residential_buildings";
pub const SCHOOLS: &str = "schools";
pub const UNIVERSITIES: &str = "universities";
pub const PARKINGS: &str = "parkings";
pub const HOSPITALS: &str = "hospitals";
pub const ENTERTAINMENTS: &str = "entertainments";
pub const LEISURES: &str = "leisures";
pub const BARS: &str = "bars";
pub const FOODS: &str = "foods";
pub const SUPERMARKETS: &str = "supermarkets";
pub const SHOPS: &str = "shops";
pub const TOURISMS: &str = "tourisms";

pub const RESTAURANTS: &str = "restaurants";
pub const MEDIAN_RANKING_PERCENTILE: &str = "median_ranking_percentile";
pub const SUCCESSFUL_RESTAURANTS: &str = "successful_restaurants";
pub const SUCCESSFUL_RESTAURANTS_ANY: &str = "successful_restaurants_any";
pub const SUCCESSFUL_CHEAP_EATS: &str = "successful_cheap_eats";
pub const SUCCESSFUL_MID_RANGE: &str = "successful_mid_range";
pub const SUCCESSFUL_FINE_DINING: &str = "successful_fine_dining";

// Columns of the Zurich demographic table.
pub const PROPORTION_OF_FOREIGNERS: &str = "proportion_of_foreigners";
pub const POPULATION: &str = "population";
pub const EMPLOYEE: &str = "employee";
pub const WORKPLACES: &str = "workplaces";

/// Default feature set offered to the model trainer.
pub const DEFAULT_MODEL_FEATURES: &[&str] = &[
    PROPORTION_OF_FOREIGNERS,
    POPULATION,
    EMPLOYEE,
    WORKPLACES,
    STREETS_MOTORWAYS,
    STREETS_MAJOR,
    STREETS_MINOR,
    STREETS_PEDESTRIAN,
    PUBLIC_TRANSPORT_STATION,
    PUBLIC_TRANSPORT_STOPS,
    PUBLIC_BUILDINGS,
    RESIDENTIAL_BUILDINGS,
    SCHOOLS,
    UNIVERSITIES,
    PARKINGS,
    HOSPITALS,
    ENTERTAINMENTS,
    LEISURES,
    SUPERMARKETS,
    BARS,
    SHOPS,
    TOURISMS,
];

/// Default binary training target.
pub const DEFAULT_TARGET: &str = SUCCESSFUL_RESTAURANTS_ANY;
