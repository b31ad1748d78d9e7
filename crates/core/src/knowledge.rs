//! Static reference text fed into prompts. Initialized once at compile time,
//! never mutated.

pub const SCHEMA_KNOWLEDGE: &str = "\
DATABASE SCHEMA:

1. AutomationRule:
   - id (string, UUID): auto-generated unique identifier
   - name (string): rule name (not unique)
   - description (string, optional): rule description
   - isEnabled (bool): whether the rule is active
   - createdAt / updatedAt (datetime, optional): timestamps
   - maxExecutions (int, optional): maximum execution limit
   - executionsRemaining (int, optional): remaining executions
   - startTime / endTime (datetime, optional): active time window

2. AutomationConditionType:
   - id (string, UUID): auto-generated identifier
   - rule_id (string): foreign key to AutomationRule
   - conditionType (string): \"signalDetection\" or \"spectralEnergy\"
   - parameters (object):
     * signalDetection: minFrequencyMHz (10-6000), maxFrequencyMHz (10-6000),
       signalType (one of Energy, 5G, LTE, QPSK, CW, PCMPM, CPM, CPMFM, BPSK, SOQPSK)
     * spectralEnergy: minFrequencyMHz (10-6000), maxFrequencyMHz (10-6000),
       threshold_dBm (-150 to 150)
   - isSatisfied (bool): condition satisfaction status

3. AutomationActionType:
   - id (string, UUID): auto-generated identifier
   - rule_id (string): foreign key to AutomationRule
   - actionType (string): \"frequencyScanRequest\", \"geolocationRequest\", or \"userNotification\"
   - parameters (object):
     * frequencyScanRequest: sensorIds (list of sensor ids)
     * geolocationRequest: algorithm (TDOA or PDOA), sensorIds (list, min 2)
     * userNotification: message (string)
";

pub const RF_SPECTRUM_KNOWLEDGE: &str = "\
RF SPECTRUM ANALYSIS DOMAIN KNOWLEDGE:

SIGNAL TYPES:
- Energy: general RF energy detection
- 5G: fifth-generation cellular network signals
- LTE: Long-Term Evolution (4G) cellular signals
- QPSK: Quadrature Phase Shift Keying modulation
- CW: continuous wave signals
- PCMPM: pulse code modulation - phase modulation
- CPM: continuous phase modulation
- CPMFM: continuous phase frequency modulation
- BPSK: Binary Phase Shift Keying
- SOQPSK: Shaped Offset Quadrature Phase Shift Keying

FREQUENCY RANGES:
- Supported range: 10 MHz to 6000 MHz (6 GHz)
- Common bands: VHF (30-300 MHz), UHF (300-3000 MHz), SHF (3-30 GHz)

POWER MEASUREMENTS:
- dBm: decibels relative to 1 milliwatt
- Supported range: -150 dBm (very weak) to +150 dBm (very strong)
- Typical ambient RF: -90 to -50 dBm

GEOLOCATION METHODS:
- TDOA (Time Difference of Arrival): uses time differences between sensors
- PDOA (Phase Difference of Arrival): uses phase differences for positioning

CONDITION TYPES:
- signalDetection: monitors for specific signal types in frequency ranges
- spectralEnergy: monitors energy levels in frequency bands

ACTION TYPES:
- frequencyScanRequest: initiates frequency scanning with sensors
- geolocationRequest: performs signal source location
- userNotification: alerts users of detected conditions
";
