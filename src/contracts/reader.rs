//! Reader contract bindings for querying markets, positions and orders

use alloy::sol;

sol! {
    /// Market definition
    #[derive(Debug, Default)]
    struct MarketProps {
        address marketToken;
        address indexToken;    // Zero for swap-only pools
        address longToken;
        address shortToken;
    }

    #[derive(Debug, Default)]
    struct PositionAddresses {
        address account;
        address market;
        address collateralToken;
    }

    #[derive(Debug, Default)]
    struct PositionNumbers {
        uint256 sizeInUsd;         // USD (30 decimals)
        uint256 sizeInTokens;      // Index token decimals
        uint256 collateralAmount;  // Collateral token decimals
        int256 pendingImpactAmount;
        uint256 borrowingFactor;
        uint256 fundingFeeAmountPerSize;
        uint256 longTokenClaimableFundingAmountPerSize;
        uint256 shortTokenClaimableFundingAmountPerSize;
        uint256 increasedAtTime;
        uint256 decreasedAtTime;
    }

    #[derive(Debug, Default)]
    struct PositionFlags {
        bool isLong;
    }

    /// Raw position storage
    #[derive(Debug, Default)]
    struct PositionProps {
        PositionAddresses addresses;
        PositionNumbers numbers;
        PositionFlags flags;
    }

    #[derive(Debug, Default)]
    struct OrderAddresses {
        address account;
        address receiver;
        address cancellationReceiver;
        address callbackContract;
        address uiFeeReceiver;
        address market;
        address initialCollateralToken;
        address[] swapPath;
    }

    #[derive(Debug, Default)]
    struct OrderNumbers {
        uint8 orderType;
        uint8 decreasePositionSwapType;
        uint256 sizeDeltaUsd;
        uint256 initialCollateralDeltaAmount;
        uint256 triggerPrice;
        uint256 acceptablePrice;
        uint256 executionFee;
        uint256 callbackGasLimit;
        uint256 minOutputAmount;
        uint256 updatedAtTime;
        uint256 validFromTime;
        uint256 srcChainId;
    }

    #[derive(Debug, Default)]
    struct OrderFlags {
        bool isLong;
        bool shouldUnwrapNativeToken;
        bool isFrozen;
        bool autoCancel;
    }

    #[derive(Debug, Default)]
    struct OrderProps {
        OrderAddresses addresses;
        OrderNumbers numbers;
        OrderFlags flags;
        bytes32[] dataList;
    }

    /// Order waiting for keeper execution
    #[derive(Debug, Default)]
    struct OrderInfo {
        bytes32 orderKey;
        OrderProps order;
    }

    /// Reader contract interface
    #[sol(rpc)]
    interface IReader {
        /// Page through all markets
        function getMarkets(address dataStore, uint256 start, uint256 end) external view returns (MarketProps[] memory);

        /// Get a single market
        function getMarket(address dataStore, address market) external view returns (MarketProps memory);

        /// Page through an account's open positions
        function getAccountPositions(address dataStore, address account, uint256 start, uint256 end) external view returns (PositionProps[] memory);

        /// Page through an account's pending orders
        function getAccountOrders(address dataStore, address account, uint256 start, uint256 end) external view returns (OrderInfo[] memory);
    }
}
