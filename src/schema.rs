diesel::table! {
    seasonality.assets (id) {
        id -> Integer,
        symbol -> Text,
        name -> Nullable<Text>,
    }
}

diesel::table! {
    seasonality.historical_data (id) {
        id -> BigInt,
        symbol -> Text,
        trade_date -> Date,
        open -> Double,
        high -> Double,
        low -> Double,
        close -> Double,
        value -> BigInt,
        contract -> Text,
        instrument_id -> Nullable<BigInt>,
    }
}

diesel::table! {
    seasonality.continuous_prices (trade_date, symbol) {
        trade_date -> Date,
        symbol -> Text,
        open -> Double,
        high -> Double,
        low -> Double,
        close -> Double,
    }
}

diesel::table! {
    seasonality.mrci_contract_prices (id) {
        id -> BigInt,
        asset_id -> Integer,
        trade_date -> Date,
        open -> Nullable<Double>,
        high -> Nullable<Double>,
        low -> Nullable<Double>,
        close -> Nullable<Double>,
        volume -> Nullable<BigInt>,
        open_interest -> Nullable<BigInt>,
        contract_code -> Text,
    }
}

diesel::table! {
    seasonality.scrape_log_mrci (id) {
        id -> SmallInt,
        last_date -> Date,
        updated_at -> Timestamp,
    }
}
