pub mod tungstenite_connector;
