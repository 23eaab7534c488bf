use device_descriptor::*;

device! {
    /// The Status register maintains all flags related to alert thresholds and
    /// battery insertion or removal.
    Status(u16 @ 0x00, default = 0x0002) {
        /// Power-On Reset. This bit is set to 1 when the device detects that
        /// a software or hardware POR event has occurred. This bit must be
        /// cleared by system software to detect the next POR event.
        por @ 1..2 => PowerOnReset {
            NoReset = 0,
            Reset = 1
        },
        /// Minimum Current Alert Threshold Exceeded.
        imn @ 2..3 => Bit {
            NotSet = 0,
            Set = 1
        },
        /// Battery Status. Useful when the IC is used in a host-side
        /// application. This bit is set to 0 when a battery is present in the
        /// system and set to 1 when the battery is absent.
        bst @ 3..4 => BatteryStatus {
            Present = 0,
            Absent = 1
        },
        /// State-of-Charge 1% Change Alert.
        dsoci @ 7..8 => Bit,
        /// Battery Insertion.
        bi @ 11..12 => Bit,
        /// Battery Removal.
        br @ 15..16 => Bit
    }

    /// Reported remaining capacity, filtered to remove abrupt jumps.
    RepCap(u16 @ 0x05) {
        capacity @ 0..16 => u16
    }

    /// Reported state-of-charge percentage output for use by the application.
    RepSOC(u16 @ 0x06) {
        percentage @ 0..16 => u16
    }

    /// Calculated percentage of battery wear, based on the ratio of learned
    /// full capacity to design capacity.
    Age(u16 @ 0x07) {
        percentage @ 0..16 => u16
    }

    /// Temperature used by the fuel gauge algorithm. Two's complement, 1/256
    /// degrees Celsius per LSB.
    Temp(u16 @ 0x08) {
        temperature @ 0..16 => u16
    }

    /// VCell reports the voltage measured between BATT and GND.
    VCell(u16 @ 0x09) {
        voltage @ 0..16 => u16
    }

    /// Current reports the voltage between the CSP and CSN pins. Two's
    /// complement, 1.5625uV/Rsense per LSB.
    Current(u16 @ 0x0A) {
        current @ 0..16 => u16
    }

    /// Average of the Current register readings, default filter period 5.625
    /// seconds.
    AvgCurrent(u16 @ 0x0B) {
        current @ 0..16 => u16
    }

    /// State-of-charge before any filtering or empty compensation is applied.
    MixSOC(u16 @ 0x0D) {
        percentage @ 0..16 => u16
    }

    /// Remaining capacity before any filtering or empty compensation is
    /// applied.
    MixCap(u16 @ 0x0F, default = 0x0000) {
        capacity @ 0..16 => u16
    }

    /// Full capacity that is reported to the application, compensated for the
    /// present conditions.
    FullCapRep(u16 @ 0x10, default = 0x0000) {
        capacity @ 0..16 => u16
    }

    /// Estimated time to empty under present temperature and load.
    TTE(u16 @ 0x11) {
        time @ 0..16 => u16
    }

    /// Total number of charge/discharge cycles that have occurred, in
    /// increments of 1% of a full cycle.
    Cycles(u16 @ 0x17, default = 0x0000) {
        cycles_percentage @ 0..16 => u16
    }

    /// Expected capacity of the cell. Used to determine when the learning
    /// cycle is complete.
    DesignCap(u16 @ 0x18, default = 0x0000) {
        capacity @ 0..16 => u16
    }

    /// Average of the VCell register readings.
    AvgVCell(u16 @ 0x19) {
        voltage @ 0..16 => u16
    }

    /// Maximum and minimum Current register readings since the last reset.
    /// One byte each, 0.40mV/Rsense per LSB, two's complement.
    MaxMinCurr(u16 @ 0x1C, default = 0x807F) {
        max_current @ 8..16 => u8,
        min_current @ 0..8 => u8
    }

    /// Charge termination current. When current falls below this threshold
    /// near full voltage, the cell is considered full.
    IChgTerm(u16 @ 0x1E, default = 0x0640) {
        current @ 0..16 => u16
    }

    /// Full discharge capacity of the cell as learned by the algorithm, not
    /// compensated for temperature or load.
    FullCapNom(u16 @ 0x23, default = 0x0000) {
        capacity @ 0..16 => u16
    }

    /// Sets the averaging periods for the mixing algorithm and the averaged
    /// readings.
    FilterCfg(u16 @ 0x29, default = 0xCEA4) {
        temp @ 11..14 => u8,
        mix @ 7..11 => u8,
        volt @ 4..7 => u8,
        curr @ 0..4 => u8
    }

    /// Sets the conditions for entering and exiting the relaxed state, in
    /// which open-circuit voltage learning takes place.
    RelaxCfg(u16 @ 0x2A, default = 0x2039) {
        load @ 9..16 => u8,
        dv @ 4..9 => u8,
        dt @ 0..4 => u8
    }

    /// Characterization information critical to computing the open-circuit
    /// voltage of a cell under loaded conditions. Learned by the algorithm.
    RComp0(u16 @ 0x38, default = 0x0000) {}

    /// Temperature compensation information for the RComp0 value. Learned by
    /// the algorithm.
    TempCo(u16 @ 0x39, default = 0x0000) {}

    /// Sets thresholds related to empty detection. VE is the empty voltage
    /// target during load (10mV per LSB), VR is the recovery voltage that
    /// clears empty detection (40mV per LSB).
    VEmpty(u16 @ 0x3A, default = 0xA561) {
        ve @ 7..16 => u16,
        vr @ 0..7 => u16
    }

    /// Flags of the fuel gauge algorithm state.
    FStat(u16 @ 0x3D) {
        /// Data Not Ready. Set to 1 at power-up while the first measurements
        /// are being made.
        dnr @ 0..1 => DataNotReady {
            Ready = 0,
            NotReady = 1
        },
        /// Full Qualified. Set when charge termination has been detected.
        fq @ 7..8 => Bit,
        /// Empty Detection.
        e_det @ 8..9 => Bit
    }

    /// Charge accumulated between relaxation points, on the capacity scale
    /// divided by 16.
    DQAcc(u16 @ 0x45, default = 0x0017) {
        capacity @ 0..16 => u16
    }

    /// Percentage of the cell charged between relaxation points, paired with
    /// DQAcc.
    DPAcc(u16 @ 0x46, default = 0x0190) {
        percentage @ 0..16 => u16
    }

    /// Commands the fuel gauge. Writing the soft wakeup code forces the IC
    /// out of hibernate while HibCfg is cleared.
    Command(u16 @ 0x60, default = 0x0000) {
        command @ 0..16 => CommandKind {
            Clear = 0x0000,
            SoftWakeup = 0x0090
        }
    }

    /// Controls hibernate mode entry and exit.
    HibCfg(u16 @ 0xBA, default = 0x870C) {
        /// When set, the IC may enter hibernate mode.
        en_hib @ 15..16 => Bit,
        hib_config @ 0..15 => u16
    }

    /// Configures state-of-charge hold behaviour near empty and full.
    SOCHold(u16 @ 0xD3, default = 0x0000) {
        /// Holds the reported state of charge at 99% until full is detected.
        hold_en_99pc @ 12..13 => Bit,
        empty_volt_hold @ 5..12 => u8,
        /// State of charge reported as 0% below this level, 0.5% per LSB.
        empty_soc_hold @ 0..5 => u8
    }

    /// Selects the battery model and triggers a model refresh.
    ModelCfg(u16 @ 0xDB, default = 0x0000) {
        /// Set to command the model to be refreshed. Cleared by the IC when
        /// the refresh is complete.
        refresh @ 15..16 => Bit,
        /// Set for cells with a charge voltage above 4.25V.
        v_chg @ 10..11 => VChg {
            _4_2V = 0,
            _4_4V = 1
        },
        model_id @ 4..8 => ModelId {
            /// Lithium cobalt oxide and most lithium variants. Suitable for
            /// the vast majority of cells.
            Generic = 0,
            /// Lithium NCR or NCA cells.
            NcrNca = 2,
            LiFePO4 = 6
        }
    }
}
